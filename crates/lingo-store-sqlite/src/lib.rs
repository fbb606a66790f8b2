// crates/lingo-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Locale Store
// Description: Embedded LocaleStore backed by SQLite.
// Purpose: Durable user->locale records without a networked database.
// Dependencies: lingo-core, rusqlite, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! This crate implements a durable [`LocaleStore`] over a single `SQLite`
//! connection. The embedded engine serializes writers, so all access goes
//! through one mutex-guarded connection; the async contract is satisfied by
//! running each statement on the blocking pool. The schema is the two-column
//! `user_locales (id, locale)` table with replace-on-conflict upserts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use lingo_core::LocaleCode;
use lingo_core::LocaleStore;
use lingo_core::StoreError;
use lingo_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema statement for the locale table.
const SCHEMA_SQL: &str =
    "CREATE TABLE IF NOT EXISTS user_locales (id TEXT PRIMARY KEY, locale TEXT NOT NULL)";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` locale store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite locale store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite locale store db error: {0}")]
    Db(String),
    /// Invalid store data.
    #[error("sqlite locale store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Backend(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed locale store with a single writer connection.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Statements run on the blocking pool, never on the request path.
#[derive(Clone)]
pub struct SqliteLocaleStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Whether the store has been closed.
    closed: Arc<AtomicBool>,
}

impl SqliteLocaleStore {
    /// Opens the database, applies pragmas, and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        }
        let connection =
            Connection::open(&config.path).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .execute(SCHEMA_SQL, [])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns [`StoreError::Closed`] once the store has been closed.
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Runs `operation` against the shared connection on the blocking pool.
    async fn with_connection<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);
            operation(&guard)
        })
        .await
        .map_err(|err| StoreError::Backend(err.to_string()))?
        .map_err(|err| StoreError::Backend(err.to_string()))
    }
}

#[async_trait::async_trait]
impl LocaleStore for SqliteLocaleStore {
    async fn save(&self, user: UserId, locale: LocaleCode) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.with_connection(move |connection| {
            connection
                .execute(
                    "INSERT INTO user_locales (id, locale) VALUES (?1, ?2) ON CONFLICT(id) DO \
                     UPDATE SET locale = excluded.locale",
                    params![user.to_string(), locale.as_str()],
                )
                .map(|_| ())
        })
        .await
    }

    async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        self.ensure_open()?;
        let stored: Option<String> = self
            .with_connection(move |connection| {
                connection
                    .query_row(
                        "SELECT locale FROM user_locales WHERE id = ?1",
                        params![user.to_string()],
                        |row| row.get(0),
                    )
                    .optional()
            })
            .await?;
        stored
            .map(|code| LocaleCode::new(&code).map_err(|err| StoreError::Invalid(err.to_string())))
            .transpose()
    }

    async fn exists(&self, user: UserId) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let found: Option<i64> = self
            .with_connection(move |connection| {
                connection
                    .query_row(
                        "SELECT 1 FROM user_locales WHERE id = ?1",
                        params![user.to_string()],
                        |row| row.get(0),
                    )
                    .optional()
            })
            .await?;
        Ok(found.is_some())
    }

    async fn remove(&self, user: UserId) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.with_connection(move |connection| {
            connection
                .execute("DELETE FROM user_locales WHERE id = ?1", params![user.to_string()])
                .map(|_| ())
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        // SQLite writes through on every statement; close only gates the
        // contract and leaves the connection to drop with the last handle.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for SqliteLocaleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLocaleStore")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
