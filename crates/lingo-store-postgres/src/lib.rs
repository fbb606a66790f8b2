// crates/lingo-store-postgres/src/lib.rs
// ============================================================================
// Module: Postgres Locale Store
// Description: Networked LocaleStore backed by Postgres.
// Purpose: Durable user->locale records shared across service instances.
// Dependencies: lingo-core, postgres, r2d2, r2d2_postgres, serde, thiserror
// ============================================================================

//! ## Overview
//! This crate implements a durable [`LocaleStore`] over a pooled Postgres
//! connection set. The schema is the two-column `user_locales (id, locale)`
//! table with `ON CONFLICT` upserts. Construction establishes the pool and
//! runs the migration eagerly, so an unreachable host or bad credentials fail
//! here and the caller can fall back to the file-backed store instead of
//! aborting startup. Extra server parameters from configuration are passed
//! through as startup options.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use lingo_core::LocaleCode;
use lingo_core::LocaleStore;
use lingo_core::StoreError;
use lingo_core::UserId;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Postgres store configuration.
///
/// # Invariants
/// - `properties` keys are passed verbatim as server startup parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresStoreConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database user.
    pub user: String,
    /// Database password.
    #[serde(default)]
    pub password: String,
    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Statement timeout in milliseconds.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    /// Extra server parameters appended to the connection options.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Returns the default Postgres port.
const fn default_port() -> u16 {
    5432
}

/// Returns the default maximum pool size.
const fn default_max_connections() -> u32 {
    10
}

/// Returns the default connect timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Returns the default statement timeout in milliseconds.
const fn default_statement_timeout_ms() -> u64 {
    30_000
}

/// Builds the `options` startup string from timeouts and extra properties.
fn server_options(config: &PostgresStoreConfig) -> String {
    let mut options = format!("-c statement_timeout={}", config.statement_timeout_ms);
    for (key, value) in &config.properties {
        options.push_str(&format!(" -c {key}={value}"));
    }
    options
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Postgres store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding credentials.
#[derive(Debug, Error)]
pub enum PostgresStoreError {
    /// Postgres or pool error.
    #[error("postgres locale store error: {0}")]
    Postgres(String),
    /// Invalid data error.
    #[error("postgres locale store invalid data: {0}")]
    Invalid(String),
}

impl From<PostgresStoreError> for StoreError {
    fn from(error: PostgresStoreError) -> Self {
        match error {
            PostgresStoreError::Postgres(message) => Self::Backend(message),
            PostgresStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Connection pool alias for the locale store.
type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Postgres-backed locale store with a pooled connection set.
///
/// # Invariants
/// - The pool is present until `close`; operations after close fail with
///   [`StoreError::Closed`].
pub struct PostgresLocaleStore {
    /// Connection pool, taken on close.
    pool: Arc<Mutex<Option<PgPool>>>,
}

impl PostgresLocaleStore {
    /// Creates the store, establishing the pool and running the migration.
    ///
    /// # Errors
    ///
    /// Returns [`PostgresStoreError`] when the host is unreachable, the
    /// credentials are rejected, or the schema cannot be created.
    pub fn new(config: &PostgresStoreConfig) -> Result<Self, PostgresStoreError> {
        let mut pg_config = postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .options(&server_options(config));
        if !config.password.is_empty() {
            pg_config.password(&config.password);
        }
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build(manager)
            .map_err(|err| PostgresStoreError::Postgres(err.to_string()))?;
        let store = Self {
            pool: Arc::new(Mutex::new(Some(pool))),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Ensures the locale schema exists.
    fn migrate(&self) -> Result<(), PostgresStoreError> {
        let pool =
            self.current_pool().map_err(|err| PostgresStoreError::Postgres(err.to_string()))?;
        let mut connection =
            pool.get().map_err(|err| PostgresStoreError::Postgres(err.to_string()))?;
        connection
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS user_locales (id VARCHAR(36) PRIMARY KEY, locale \
                 VARCHAR(16) NOT NULL)",
            )
            .map_err(|err| PostgresStoreError::Postgres(err.to_string()))?;
        Ok(())
    }

    /// Returns a pool handle or [`StoreError::Closed`].
    fn current_pool(&self) -> Result<PgPool, StoreError> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::Closed)
    }

    /// Runs `operation` on a pooled connection on the blocking pool.
    async fn with_connection<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut postgres::Client) -> Result<T, postgres::Error> + Send + 'static,
    {
        let pool = self.current_pool()?;
        tokio::task::spawn_blocking(move || {
            let mut connection =
                pool.get().map_err(|err| StoreError::Backend(err.to_string()))?;
            operation(&mut connection).map_err(|err| StoreError::Backend(err.to_string()))
        })
        .await
        .map_err(|err| StoreError::Backend(err.to_string()))?
    }
}

impl Drop for PostgresLocaleStore {
    fn drop(&mut self) {
        // Pool teardown can block on open connections; keep it off the
        // dropping thread.
        if let Some(pool) = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = std::thread::spawn(move || drop(pool));
        }
    }
}

#[async_trait::async_trait]
impl LocaleStore for PostgresLocaleStore {
    async fn save(&self, user: UserId, locale: LocaleCode) -> Result<(), StoreError> {
        self.with_connection(move |connection| {
            connection
                .execute(
                    "INSERT INTO user_locales (id, locale) VALUES ($1, $2) ON CONFLICT (id) DO \
                     UPDATE SET locale = EXCLUDED.locale",
                    &[&user.to_string(), &locale.as_str()],
                )
                .map(|_| ())
        })
        .await
    }

    async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        let stored: Option<String> = self
            .with_connection(move |connection| {
                connection
                    .query_opt(
                        "SELECT locale FROM user_locales WHERE id = $1",
                        &[&user.to_string()],
                    )
                    .map(|row| row.map(|row| row.get(0)))
            })
            .await?;
        stored
            .map(|code| LocaleCode::new(&code).map_err(|err| StoreError::Invalid(err.to_string())))
            .transpose()
    }

    async fn exists(&self, user: UserId) -> Result<bool, StoreError> {
        let found = self
            .with_connection(move |connection| {
                connection
                    .query_opt("SELECT 1 FROM user_locales WHERE id = $1", &[&user.to_string()])
            })
            .await?;
        Ok(found.is_some())
    }

    async fn remove(&self, user: UserId) -> Result<(), StoreError> {
        self.with_connection(move |connection| {
            connection
                .execute("DELETE FROM user_locales WHERE id = $1", &[&user.to_string()])
                .map(|_| ())
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        if let Some(pool) = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = std::thread::spawn(move || drop(pool));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PostgresLocaleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let closed = self.pool.lock().unwrap_or_else(PoisonError::into_inner).is_none();
        f.debug_struct("PostgresLocaleStore").field("closed", &closed).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use std::collections::BTreeMap;

    use super::PostgresStoreConfig;
    use super::PostgresStoreError;
    use super::server_options;

    /// Minimal config pointing at a closed local port.
    fn unreachable_config() -> PostgresStoreConfig {
        PostgresStoreConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            database: "lingo".to_string(),
            user: "lingo".to_string(),
            password: String::new(),
            max_connections: 1,
            connect_timeout_ms: 200,
            statement_timeout_ms: 1_000,
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn server_options_carry_statement_timeout() {
        let config = unreachable_config();
        assert_eq!(server_options(&config), "-c statement_timeout=1000");
    }

    #[test]
    fn server_options_append_extra_properties_in_stable_order() {
        let mut config = unreachable_config();
        config.properties.insert("search_path".to_string(), "lingo".to_string());
        config.properties.insert("application_name".to_string(), "lingo".to_string());
        assert_eq!(
            server_options(&config),
            "-c statement_timeout=1000 -c application_name=lingo -c search_path=lingo"
        );
    }

    #[test]
    fn unreachable_host_fails_construction_instead_of_hanging() {
        let result = super::PostgresLocaleStore::new(&unreachable_config());
        assert!(matches!(result, Err(PostgresStoreError::Postgres(_))));
    }
}
