// crates/lingo-core/src/interfaces/mod.rs
// ============================================================================
// Module: Lingo Interfaces
// Description: Backend-agnostic contracts for persistence, sync, and expansion.
// Purpose: Define the surfaces the runtime uses without backend details.
// Dependencies: crate::core, async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Lingo integrates with durable storage, the
//! cross-instance synchronization transport, and the host's placeholder
//! ecosystem without embedding backend specifics. Store implementations are
//! asynchronous and must never be reached from the synchronous request path;
//! the runtime only touches them from spawned tasks or explicit futures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Store Contract
// ============================================================================

/// Locale store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding credentials or connection strings.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// Store I/O error.
    #[error("locale store io error: {0}")]
    Io(String),
    /// Backend engine error.
    #[error("locale store backend error: {0}")]
    Backend(String),
    /// Stored data is invalid.
    #[error("locale store invalid data: {0}")]
    Invalid(String),
    /// Store has been closed.
    #[error("locale store closed")]
    Closed,
}

/// Durable user->locale storage behind one async contract.
///
/// Implementations provide upsert semantics per user id (last write wins) and
/// at-least-once intent for saves. `close` must be idempotent and safe to
/// call even when construction never fully succeeded.
#[async_trait::async_trait]
pub trait LocaleStore: Send + Sync {
    /// Persists `locale` for `user`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails; callers on the hot path
    /// log and swallow it.
    async fn save(&self, user: UserId, locale: LocaleCode) -> Result<(), StoreError>;

    /// Loads the stored locale for `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError>;

    /// Reports whether a durable record exists for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    async fn exists(&self, user: UserId) -> Result<bool, StoreError>;

    /// Deletes the durable record for `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    async fn remove(&self, user: UserId) -> Result<(), StoreError>;

    /// Flushes pending state and releases resources.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the final flush fails; the store is
    /// considered closed regardless.
    async fn close(&self) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Sync Contract
// ============================================================================

/// Synchronization bus errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport connection failed.
    #[error("sync connection error: {0}")]
    Connection(String),
    /// Publish failed.
    #[error("sync publish error: {0}")]
    Publish(String),
    /// Envelope failed strict decoding.
    #[error("sync envelope rejected: {0}")]
    Decode(String),
}

/// Handler invoked for each decoded envelope received from other instances.
pub type SyncHandler = std::sync::Arc<dyn Fn(SyncEnvelope) + Send + Sync>;

/// Publish/subscribe channel propagating locale changes across instances.
pub trait SyncBus: Send + Sync {
    /// Reports whether the bus is connected and enabled.
    fn enabled(&self) -> bool;

    /// Broadcasts `envelope` to other instances.
    ///
    /// Fire-and-forget: the publish runs off the latency-sensitive path and a
    /// failure is logged and dropped, never retried or surfaced.
    fn publish(&self, envelope: &SyncEnvelope);

    /// Starts the background subscription loop feeding `handler`.
    ///
    /// The loop reconnects indefinitely on transport failure (fixed backoff)
    /// while the bus is enabled. Malformed envelopes are dropped and logged
    /// without reaching `handler`.
    fn subscribe(&self, handler: SyncHandler);

    /// Unsubscribes, stops the loop with a bounded wait, and drops resources.
    ///
    /// Idempotent; later [`SyncBus::publish`] calls become no-ops.
    fn close(&self);
}

// ============================================================================
// SECTION: Sync Envelope
// ============================================================================

/// The unit broadcast on a locale change.
///
/// # Invariants
/// - Wire form is exactly `{"id": "<uuid>", "locale": "<code>"}`; decoding is
///   strict and rejects unknown fields, missing fields, and invalid values
///   wholesale rather than partially parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncEnvelope {
    /// User whose locale changed.
    pub id: UserId,
    /// The newly selected locale.
    pub locale: LocaleCode,
}

impl SyncEnvelope {
    /// Encodes the envelope into its compact textual wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{{\"id\": \"{}\", \"locale\": \"{}\"}}", self.id, self.locale)
    }

    /// Decodes an envelope from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Decode`] for anything other than the exact
    /// two-field shape with a valid UUID and locale code.
    pub fn decode(payload: &str) -> Result<Self, SyncError> {
        serde_json::from_str(payload.trim()).map_err(|err| SyncError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Placeholder Expansion
// ============================================================================

/// External collaborator resolving non-internal placeholder tokens.
///
/// Invoked only when tokens remain after the internal `%lang_<key>%` pass,
/// never unconditionally. Implementations are supplied by the host process.
pub trait PlaceholderExpander: Send + Sync {
    /// Substitutes external placeholder tokens in `text` for `user`.
    fn expand(&self, user: UserId, text: &str) -> String;
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use super::SyncEnvelope;
    use super::SyncError;
    use crate::core::identifiers::LocaleCode;
    use crate::core::identifiers::UserId;

    /// Builds a fixed envelope for codec tests.
    fn sample() -> SyncEnvelope {
        SyncEnvelope {
            id: UserId::parse("6f1c8a52-3a77-4a6d-9c01-5f3f1f0a2b4c").unwrap(),
            locale: LocaleCode::new("fr_fr").unwrap(),
        }
    }

    #[test]
    fn encode_matches_the_wire_contract() {
        assert_eq!(
            sample().encode(),
            "{\"id\": \"6f1c8a52-3a77-4a6d-9c01-5f3f1f0a2b4c\", \"locale\": \"fr_fr\"}"
        );
    }

    #[test]
    fn decode_round_trips_encode() {
        let envelope = sample();
        assert_eq!(SyncEnvelope::decode(&envelope.encode()).unwrap(), envelope);
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let payload = "{\"id\": \"6f1c8a52-3a77-4a6d-9c01-5f3f1f0a2b4c\", \"locale\": \"fr_fr\", \"extra\": 1}";
        assert!(matches!(SyncEnvelope::decode(payload), Err(SyncError::Decode(_))));
    }

    #[test]
    fn decode_rejects_missing_fields() {
        assert!(matches!(
            SyncEnvelope::decode("{\"id\": \"6f1c8a52-3a77-4a6d-9c01-5f3f1f0a2b4c\"}"),
            Err(SyncError::Decode(_))
        ));
    }

    #[test]
    fn decode_rejects_invalid_uuid() {
        let payload = "{\"id\": \"nope\", \"locale\": \"fr_fr\"}";
        assert!(matches!(SyncEnvelope::decode(payload), Err(SyncError::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_json_noise() {
        assert!(matches!(SyncEnvelope::decode("locale update!"), Err(SyncError::Decode(_))));
    }

    #[test]
    fn decode_normalizes_locale_case() {
        let payload = "{\"id\": \"6f1c8a52-3a77-4a6d-9c01-5f3f1f0a2b4c\", \"locale\": \"FR_FR\"}";
        assert_eq!(SyncEnvelope::decode(payload).unwrap().locale.as_str(), "fr_fr");
    }
}
