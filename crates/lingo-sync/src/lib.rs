// crates/lingo-sync/src/lib.rs
// ============================================================================
// Module: Redis Sync Bus
// Description: Pub/sub transport propagating locale changes across instances.
// Purpose: Keep cooperating instances coherent without a database round-trip.
// Dependencies: lingo-core, r2d2, redis, serde, tokio, tracing
// ============================================================================

//! ## Overview
//! The Redis bus broadcasts [`SyncEnvelope`] values on one channel. Publishes
//! borrow a pooled connection on the blocking pool and are fire-and-forget: a
//! failure is logged and dropped, never retried. The subscriber runs on a
//! dedicated named thread owning its own connection with a short read
//! timeout; any transport failure is answered by a fixed 5 second backoff and
//! a reconnect, indefinitely, until the bus is closed. Construction is lazy
//! and never blocks startup on an unreachable broker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;

use lingo_core::SyncBus;
use lingo_core::SyncEnvelope;
use lingo_core::SyncError;
use lingo_core::SyncHandler;
use redis::Commands;
use serde::Deserialize;
use tokio::runtime::Handle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed delay before a subscriber reconnect attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Read timeout on the subscriber connection; bounds shutdown latency.
const SUBSCRIBER_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Granularity of the interruptible backoff sleep.
const BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Default pub/sub channel name.
const DEFAULT_CHANNEL: &str = "lingo:locale-update";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Synchronization bus configuration.
///
/// # Invariants
/// - `channel` is shared verbatim by every cooperating instance.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncBusConfig {
    /// Whether cross-instance synchronization is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Broker host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Broker password; empty means no authentication.
    #[serde(default)]
    pub password: String,
    /// Whether to connect over TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Pub/sub channel name.
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for SyncBusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
            password: String::new(),
            use_tls: false,
            channel: default_channel(),
        }
    }
}

/// Returns the default broker host.
fn default_host() -> String {
    "localhost".to_string()
}

/// Returns the default broker port.
const fn default_port() -> u16 {
    6379
}

/// Returns the default channel name.
fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

/// Builds the broker connection URL from the configuration.
fn connection_url(config: &SyncBusConfig) -> String {
    let scheme = if config.use_tls { "rediss" } else { "redis" };
    if config.password.is_empty() {
        format!("{scheme}://{}:{}/", config.host, config.port)
    } else {
        format!("{scheme}://:{}@{}:{}/", config.password, config.host, config.port)
    }
}

// ============================================================================
// SECTION: Bus
// ============================================================================

/// Redis-backed [`SyncBus`].
///
/// # Invariants
/// - `close` is idempotent; publishes after close are no-ops.
/// - The subscriber loop stops only on close, never on transport failure.
pub struct RedisSyncBus {
    /// Client used by the subscriber for its dedicated connection.
    client: redis::Client,
    /// Pooled connections used by publishes.
    pool: r2d2::Pool<redis::Client>,
    /// Channel shared by all cooperating instances.
    channel: String,
    /// Whether the bus is enabled; cleared on close.
    enabled: Arc<AtomicBool>,
    /// Subscriber thread, joined on close.
    subscriber: Mutex<Option<JoinHandle<()>>>,
    /// Runtime handle used to offload publishes.
    handle: Handle,
}

impl RedisSyncBus {
    /// Creates the bus without contacting the broker.
    ///
    /// Connections are established lazily: the first publish or the
    /// subscriber loop will surface (and log) an unreachable broker.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connection`] when the connection URL is invalid.
    pub fn connect(config: &SyncBusConfig, handle: Handle) -> Result<Self, SyncError> {
        let client = redis::Client::open(connection_url(config))
            .map_err(|err| SyncError::Connection(err.to_string()))?;
        let pool = r2d2::Pool::builder()
            .max_size(4)
            .build_unchecked(client.clone());
        Ok(Self {
            client,
            pool,
            channel: config.channel.clone(),
            enabled: Arc::new(AtomicBool::new(config.enabled)),
            subscriber: Mutex::new(None),
            handle,
        })
    }

    /// Runs the subscriber loop until the bus is disabled.
    fn subscriber_loop(
        client: &redis::Client,
        channel: &str,
        enabled: &AtomicBool,
        handler: &SyncHandler,
    ) {
        while enabled.load(Ordering::SeqCst) {
            match client.get_connection() {
                Ok(mut connection) => {
                    let mut pubsub = connection.as_pubsub();
                    let _ = pubsub.set_read_timeout(Some(SUBSCRIBER_READ_TIMEOUT));
                    if let Err(err) = pubsub.subscribe(channel) {
                        tracing::warn!(%err, "sync subscribe failed, reconnecting in 5s");
                    } else if Self::pump_messages(&mut pubsub, enabled, handler) {
                        // Disabled during message pumping; leave quietly.
                        let _ = pubsub.unsubscribe(channel);
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "sync connection failed, reconnecting in 5s");
                }
            }
            Self::interruptible_backoff(enabled);
        }
    }

    /// Pumps messages until shutdown or transport failure.
    ///
    /// Returns `true` when the loop ended because the bus was disabled.
    fn pump_messages(
        pubsub: &mut redis::PubSub<'_>,
        enabled: &AtomicBool,
        handler: &SyncHandler,
    ) -> bool {
        loop {
            if !enabled.load(Ordering::SeqCst) {
                return true;
            }
            match pubsub.get_message() {
                Ok(message) => {
                    let payload: String = match message.get_payload() {
                        Ok(payload) => payload,
                        Err(err) => {
                            tracing::warn!(%err, "dropping unreadable sync payload");
                            continue;
                        }
                    };
                    match SyncEnvelope::decode(&payload) {
                        Ok(envelope) => handler(envelope),
                        Err(err) => {
                            tracing::warn!(%err, payload, "dropping malformed sync envelope");
                        }
                    }
                }
                Err(err) if err.is_timeout() => {}
                Err(err) => {
                    if enabled.load(Ordering::SeqCst) {
                        tracing::warn!(%err, "sync subscription dropped, reconnecting in 5s");
                    }
                    return false;
                }
            }
        }
    }

    /// Sleeps the reconnect delay in small steps so close stays bounded.
    fn interruptible_backoff(enabled: &AtomicBool) {
        let steps = RECONNECT_DELAY.as_millis() / BACKOFF_STEP.as_millis();
        for _ in 0..steps {
            if !enabled.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(BACKOFF_STEP);
        }
    }
}

impl SyncBus for RedisSyncBus {
    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn publish(&self, envelope: &SyncEnvelope) {
        if !self.enabled() {
            return;
        }
        let pool = self.pool.clone();
        let channel = self.channel.clone();
        let payload = envelope.encode();
        self.handle.spawn_blocking(move || {
            let result = pool
                .get()
                .map_err(|err| SyncError::Publish(err.to_string()))
                .and_then(|mut connection| {
                    connection
                        .publish::<_, _, ()>(&channel, &payload)
                        .map_err(|err| SyncError::Publish(err.to_string()))
                });
            if let Err(err) = result {
                tracing::warn!(%err, "dropping unpublished sync envelope");
            }
        });
    }

    fn subscribe(&self, handler: SyncHandler) {
        if !self.enabled() {
            return;
        }
        let client = self.client.clone();
        let channel = self.channel.clone();
        let enabled = Arc::clone(&self.enabled);
        let spawned = std::thread::Builder::new()
            .name("lingo-sync-subscriber".to_string())
            .spawn(move || Self::subscriber_loop(&client, &channel, &enabled, &handler));
        match spawned {
            Ok(join_handle) => {
                *self.subscriber.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(join_handle);
            }
            Err(err) => {
                tracing::warn!(%err, "failed to start sync subscriber thread");
            }
        }
    }

    fn close(&self) {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(join_handle) =
            self.subscriber.lock().unwrap_or_else(PoisonError::into_inner).take()
        {
            // The loop observes the flag within one read timeout or backoff
            // step, so this join is bounded in practice.
            if join_handle.join().is_err() {
                tracing::warn!("sync subscriber thread ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for RedisSyncBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSyncBus")
            .field("channel", &self.channel)
            .field("enabled", &self.enabled())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use super::SyncBusConfig;
    use super::connection_url;

    fn config() -> SyncBusConfig {
        SyncBusConfig {
            enabled: true,
            host: "redis.internal".to_string(),
            port: 6380,
            password: String::new(),
            use_tls: false,
            channel: "lingo:locale-update".to_string(),
        }
    }

    #[test]
    fn url_without_password_has_no_credentials() {
        assert_eq!(connection_url(&config()), "redis://redis.internal:6380/");
    }

    #[test]
    fn url_with_password_embeds_credentials() {
        let mut config = config();
        config.password = "hunter2".to_string();
        assert_eq!(connection_url(&config), "redis://:hunter2@redis.internal:6380/");
    }

    #[test]
    fn tls_switches_the_scheme() {
        let mut config = config();
        config.use_tls = true;
        assert_eq!(connection_url(&config), "rediss://redis.internal:6380/");
    }

    #[test]
    fn defaults_match_the_conventional_broker() {
        let defaults = SyncBusConfig::default();
        assert!(!defaults.enabled);
        assert_eq!(defaults.host, "localhost");
        assert_eq!(defaults.port, 6379);
        assert_eq!(defaults.channel, "lingo:locale-update");
    }
}
