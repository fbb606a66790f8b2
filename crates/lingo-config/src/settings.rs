// crates/lingo-config/src/settings.rs
// ============================================================================
// Module: Lingo Settings
// Description: Canonical configuration model and validation.
// Purpose: One deserialized, validated view of every recognized option.
// Dependencies: lingo-core, lingo-store-*, lingo-sync, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! The settings model covers the full configuration surface: default locale,
//! catalog root, both cache tiers' bounds, storage backend selection with
//! backend-specific parameters, synchronization, the locale-detection delay
//! consumed by the host's session-join collaborator, and message templates.
//! Validation is strict and runs once at load; assembly consumes only
//! validated settings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use lingo_core::LocaleCode;
use lingo_store_postgres::PostgresStoreConfig;
use lingo_store_sqlite::SqliteStoreConfig;
use lingo_sync::SyncBusConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Configuration failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration parsed but failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Message templates surfaced by the resolver.
///
/// # Invariants
/// - `not_found` must contain the `{key}` substitution marker.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesSettings {
    /// Template returned when a key is absent from every locale.
    #[serde(default = "default_not_found")]
    pub not_found: String,
}

impl Default for MessagesSettings {
    fn default() -> Self {
        Self {
            not_found: default_not_found(),
        }
    }
}

/// Returns the default not-found template.
fn default_not_found() -> String {
    "Translation '{key}' not found.".to_string()
}

/// Cache bounds for both resolver tiers.
///
/// # Invariants
/// - Sizes and durations must be greater than zero.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PerformanceSettings {
    /// Maximum tier-1 (resolved translation) entries.
    #[serde(default = "default_translation_cache_size")]
    pub translation_cache_size: usize,
    /// Tier-1 access-expiry in seconds.
    #[serde(default = "default_translation_cache_ttl_secs")]
    pub translation_cache_ttl_secs: u64,
    /// Maximum tier-2 (parsed message) entries.
    #[serde(default = "default_parsed_cache_size")]
    pub parsed_message_cache_size: usize,
    /// Tier-2 write-expiry in seconds.
    #[serde(default = "default_parsed_cache_ttl_secs")]
    pub parsed_message_cache_ttl_secs: u64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            translation_cache_size: default_translation_cache_size(),
            translation_cache_ttl_secs: default_translation_cache_ttl_secs(),
            parsed_message_cache_size: default_parsed_cache_size(),
            parsed_message_cache_ttl_secs: default_parsed_cache_ttl_secs(),
        }
    }
}

/// Returns the default tier-1 capacity.
const fn default_translation_cache_size() -> usize {
    500
}

/// Returns the default tier-1 access-expiry (30 minutes).
const fn default_translation_cache_ttl_secs() -> u64 {
    1_800
}

/// Returns the default tier-2 capacity.
const fn default_parsed_cache_size() -> usize {
    1_000
}

/// Returns the default tier-2 write-expiry (5 minutes).
const fn default_parsed_cache_ttl_secs() -> u64 {
    300
}

/// Locale-detection timing consumed by the host's session-join collaborator.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DetectionSettings {
    /// Delay after session join before client locale detection runs, in
    /// milliseconds. The core never consumes this; it is surfaced for the
    /// session-join collaborator.
    #[serde(default = "default_detection_delay_ms")]
    pub delay_ms: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_detection_delay_ms(),
        }
    }
}

/// Returns the default detection delay.
const fn default_detection_delay_ms() -> u64 {
    500
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// File-backed YAML document (default, and the fallback of last resort).
    #[default]
    File,
    /// Embedded `SQLite` database.
    Sqlite,
    /// Networked Postgres database.
    Postgres,
}

/// File store parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FileStorageSettings {
    /// Path of the mirrored YAML document.
    #[serde(default = "default_file_path")]
    pub path: PathBuf,
    /// Flush interval in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

impl Default for FileStorageSettings {
    fn default() -> Self {
        Self {
            path: default_file_path(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

/// Returns the default file store path.
fn default_file_path() -> PathBuf {
    PathBuf::from("data/user_locales.yml")
}

/// Returns the default flush interval in seconds.
const fn default_flush_interval_secs() -> u64 {
    30
}

/// Storage backend selection plus backend-specific parameters.
///
/// # Invariants
/// - The section matching `backend` must be present (the file section always
///   has defaults).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    /// Selected backend.
    #[serde(default, rename = "type")]
    pub backend: StorageBackend,
    /// File store parameters.
    #[serde(default)]
    pub file: FileStorageSettings,
    /// `SQLite` store parameters; required when `backend` is `sqlite`.
    #[serde(default)]
    pub sqlite: Option<SqliteStoreConfig>,
    /// Postgres store parameters; required when `backend` is `postgres`.
    #[serde(default)]
    pub postgres: Option<PostgresStoreConfig>,
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// The complete validated configuration surface.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Default locale code, also the fallback chain's terminal locale.
    pub default_locale: String,
    /// Root directory of the locale catalog tree.
    #[serde(default = "default_catalog_root")]
    pub catalog_root: PathBuf,
    /// Message templates.
    #[serde(default)]
    pub messages: MessagesSettings,
    /// Cache bounds.
    #[serde(default)]
    pub performance: PerformanceSettings,
    /// Detection timing for the session-join collaborator.
    #[serde(default)]
    pub detection: DetectionSettings,
    /// Storage selection and parameters.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Cross-instance synchronization.
    #[serde(default)]
    pub sync: SyncBusConfig,
}

/// Returns the default catalog root.
fn default_catalog_root() -> PathBuf {
    PathBuf::from("langs")
}

impl Settings {
    /// Parses settings from a TOML document and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for validation failures.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses settings from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_toml_str(&document)
    }

    /// Returns the parsed default locale.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configured code is
    /// malformed; validated settings never hit this.
    pub fn default_locale(&self) -> Result<LocaleCode, ConfigError> {
        LocaleCode::new(&self.default_locale)
            .map_err(|err| ConfigError::Invalid(format!("default_locale: {err}")))
    }

    /// Returns the tier-1 access-expiry duration.
    #[must_use]
    pub const fn translation_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.performance.translation_cache_ttl_secs)
    }

    /// Returns the tier-2 write-expiry duration.
    #[must_use]
    pub const fn parsed_message_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.performance.parsed_message_cache_ttl_secs)
    }

    /// Returns the file store flush interval.
    #[must_use]
    pub const fn file_flush_interval(&self) -> Duration {
        Duration::from_secs(self.storage.file.flush_interval_secs)
    }

    /// Validates every cross-field invariant.
    fn validate(&self) -> Result<(), ConfigError> {
        let default_locale = self.default_locale()?;
        if !default_locale.is_recognized() {
            return Err(ConfigError::Invalid(format!(
                "default_locale is not a recognized code: {default_locale}"
            )));
        }
        if !self.messages.not_found.contains("{key}") {
            return Err(ConfigError::Invalid(
                "messages.not_found must contain the {key} marker".to_string(),
            ));
        }
        if self.performance.translation_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "performance.translation_cache_size must be greater than zero".to_string(),
            ));
        }
        if self.performance.translation_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "performance.translation_cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.performance.parsed_message_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "performance.parsed_message_cache_size must be greater than zero".to_string(),
            ));
        }
        if self.performance.parsed_message_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "performance.parsed_message_cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.storage.file.flush_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "storage.file.flush_interval_secs must be greater than zero".to_string(),
            ));
        }
        match self.storage.backend {
            StorageBackend::File => {}
            StorageBackend::Sqlite => {
                if self.storage.sqlite.is_none() {
                    return Err(ConfigError::Invalid(
                        "storage.sqlite section is required for the sqlite backend".to_string(),
                    ));
                }
            }
            StorageBackend::Postgres => {
                if self.storage.postgres.is_none() {
                    return Err(ConfigError::Invalid(
                        "storage.postgres section is required for the postgres backend"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
