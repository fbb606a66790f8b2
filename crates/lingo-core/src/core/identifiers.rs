// crates/lingo-core/src/core/identifiers.rs
// ============================================================================
// Module: Lingo Identifiers
// Description: Canonical opaque identifiers for users and locales.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Lingo. User identifiers
//! wrap UUIDs and serialize as 36-character hyphenated strings. Locale codes
//! are normalized to lowercase `ll_rr` form at construction; recognition
//! against the fixed locale table is a separate, explicit check so that
//! catalog loading can reject unknown directory names without coercing them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Recognized Locales
// ============================================================================

/// The fixed set of locale codes recognized as catalog directory names.
///
/// Codes follow the lowercase `language_region` convention used by session
/// clients. Directory names outside this table are skipped at catalog load.
pub const RECOGNIZED_LOCALES: &[&str] = &[
    "cs_cz", "da_dk", "de_de", "en_gb", "en_us", "es_es", "es_mx", "fi_fi", "fr_ca", "fr_fr",
    "hu_hu", "id_id", "it_it", "ja_jp", "ko_kr", "nb_no", "nl_nl", "pl_pl", "pt_br", "pt_pt",
    "ro_ro", "ru_ru", "sv_se", "th_th", "tr_tr", "uk_ua", "vi_vn", "zh_cn", "zh_tw",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Locale code is empty after normalization.
    #[error("locale code is empty")]
    EmptyLocale,
    /// Locale code contains control characters.
    #[error("locale code contains control characters")]
    ControlCharacters,
    /// User identifier is not a valid UUID.
    #[error("invalid user id: {0}")]
    InvalidUserId(String),
}

// ============================================================================
// SECTION: User Identifier
// ============================================================================

/// User identifier scoped to the session population.
///
/// # Invariants
/// - Wire and durable form is the 36-character hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a user identifier from a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a user identifier from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidUserId`] when the input is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidUserId(raw.to_string()))
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

// ============================================================================
// SECTION: Locale Code
// ============================================================================

/// Normalized locale code.
///
/// # Invariants
/// - Always lowercase; `-` separators are normalized to `_` at construction.
/// - Never empty and never contains control characters.
/// - Membership in [`RECOGNIZED_LOCALES`] is NOT an invariant of the type;
///   callers that require it use [`LocaleCode::is_recognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Creates a normalized locale code.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the input is empty or contains
    /// control characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', "_");
        if normalized.is_empty() {
            return Err(IdentifierError::EmptyLocale);
        }
        if normalized.chars().any(char::is_control) {
            return Err(IdentifierError::ControlCharacters);
        }
        Ok(Self(normalized))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the code is in the recognized locale table.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        RECOGNIZED_LOCALES.binary_search(&self.0.as_str()).is_ok()
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocaleCode> for String {
    fn from(code: LocaleCode) -> Self {
        code.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
