// crates/lingo-core/src/core/catalog.rs
// ============================================================================
// Module: Translation Catalog
// Description: Locale-keyed catalog type and directory loader.
// Purpose: Flatten nested locale documents into immutable key->text maps.
// Dependencies: serde_yaml, thiserror, tracing, walkdir
// ============================================================================

//! ## Overview
//! The catalog maps each recognized locale to a flat, lowercase key->text
//! table built from a directory tree of YAML documents. Loading is wholesale:
//! [`CatalogLoader::load`] produces a complete [`TranslationCatalog`] that the
//! resolver publishes atomically, so readers never observe a partially loaded
//! locale. Unrecognized locale directories, unreadable documents, and
//! malformed keys are skipped with a warning rather than failing the load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

use crate::core::identifiers::LocaleCode;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog root exists but cannot be read.
    #[error("catalog root unreadable: {0}")]
    RootUnreadable(String),
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Immutable locale -> key -> raw text mapping.
///
/// # Invariants
/// - Keys are lowercase and free of control characters.
/// - Built wholesale by [`CatalogLoader::load`]; never mutated in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TranslationCatalog {
    /// Per-locale flattened translation tables.
    locales: BTreeMap<LocaleCode, BTreeMap<String, String>>,
}

impl TranslationCatalog {
    /// Builds a catalog directly from per-locale tables.
    ///
    /// Keys are lowercased and keys carrying control characters are dropped,
    /// preserving the catalog invariants for hosts that assemble tables
    /// programmatically instead of loading a directory tree.
    #[must_use]
    pub fn from_tables(tables: BTreeMap<LocaleCode, BTreeMap<String, String>>) -> Self {
        let locales = tables
            .into_iter()
            .map(|(locale, table)| {
                let table = table
                    .into_iter()
                    .filter(|(key, _)| !key.chars().any(char::is_control))
                    .map(|(key, value)| (key.to_lowercase(), value))
                    .collect();
                (locale, table)
            })
            .collect();
        Self {
            locales,
        }
    }

    /// Returns the raw text for `key` in `locale`, if present.
    #[must_use]
    pub fn text(&self, locale: &LocaleCode, key: &str) -> Option<&str> {
        self.locales.get(locale).and_then(|table| table.get(key)).map(String::as_str)
    }

    /// Reports whether the catalog carries any entries for `locale`.
    #[must_use]
    pub fn has_locale(&self, locale: &LocaleCode) -> bool {
        self.locales.contains_key(locale)
    }

    /// Returns the loaded locales in stable order.
    #[must_use]
    pub fn locales(&self) -> Vec<LocaleCode> {
        self.locales.keys().cloned().collect()
    }

    /// Returns the total number of translations across all locales.
    #[must_use]
    pub fn total_translations(&self) -> usize {
        self.locales.values().map(BTreeMap::len).sum()
    }

    /// Iterates the `(key, text)` entries of `locale` in stable order.
    pub fn entries(&self, locale: &LocaleCode) -> impl Iterator<Item = (&str, &str)> {
        self.locales
            .get(locale)
            .into_iter()
            .flat_map(|table| table.iter().map(|(key, value)| (key.as_str(), value.as_str())))
    }
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Loads a [`TranslationCatalog`] from a locale-keyed directory tree.
///
/// The immediate subdirectories of the root must be named with recognized
/// locale codes; within each, YAML documents are discovered recursively and
/// flattened per the prefix rules described on [`CatalogLoader::load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLoader;

impl CatalogLoader {
    /// Loads the full catalog from `root`.
    ///
    /// A missing root yields an empty catalog. Within the root:
    /// - subdirectories whose names are not recognized locale codes are
    ///   skipped with a warning;
    /// - a document directly in a locale root contributes no key prefix; a
    ///   document in a subfolder contributes a dot-joined prefix built from
    ///   its extension-less relative path (`menus/main.yml` -> `menus.main`);
    /// - nested mappings flatten with `_`-joined segments, sequences join
    ///   their items with newlines, and all keys are lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RootUnreadable`] when the root exists but its
    /// entries cannot be listed.
    pub fn load(root: &Path) -> Result<TranslationCatalog, CatalogError> {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "catalog root missing; loading empty catalog");
            return Ok(TranslationCatalog::default());
        }
        let entries = std::fs::read_dir(root)
            .map_err(|err| CatalogError::RootUnreadable(err.to_string()))?;
        let mut locales = BTreeMap::new();
        for entry in entries {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let locale = match LocaleCode::new(&name) {
                Ok(code) if code.is_recognized() => code,
                _ => {
                    tracing::warn!(
                        directory = %name,
                        "skipping unrecognized locale directory; use a recognized locale code"
                    );
                    continue;
                }
            };
            locales.insert(locale, Self::load_locale_dir(&path));
        }
        Ok(TranslationCatalog {
            locales,
        })
    }

    /// Loads and flattens every document under one locale directory.
    fn load_locale_dir(locale_root: &Path) -> BTreeMap<String, String> {
        let mut table = BTreeMap::new();
        for entry in WalkDir::new(locale_root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
            if !entry.file_type().is_file() || !is_yaml {
                continue;
            }
            let prefix = Self::document_prefix(locale_root, path);
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(document = %path.display(), %err, "skipping unreadable document");
                    continue;
                }
            };
            let document: serde_yaml::Value = match serde_yaml::from_str(&content) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(document = %path.display(), %err, "skipping malformed document");
                    continue;
                }
            };
            let serde_yaml::Value::Mapping(mapping) = document else {
                tracing::warn!(
                    document = %path.display(),
                    "skipping document without a top-level mapping"
                );
                continue;
            };
            let key_prefix = if prefix.is_empty() { String::new() } else { format!("{prefix}_") };
            Self::flatten_mapping(&mapping, &key_prefix, &mut table);
        }
        table
    }

    /// Computes the dot-joined document prefix relative to the locale root.
    ///
    /// A document directly in the locale root contributes no prefix, which
    /// preserves legacy flat-key compatibility.
    fn document_prefix(locale_root: &Path, document: &Path) -> String {
        let Ok(relative) = document.strip_prefix(locale_root) else {
            return String::new();
        };
        if relative.components().count() <= 1 {
            return String::new();
        }
        let mut segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        if let Some(last) = segments.last_mut()
            && let Some(stem) = Path::new(last.as_str()).file_stem()
        {
            *last = stem.to_string_lossy().into_owned();
        }
        segments.join(".")
    }

    /// Flattens one mapping level into the key table.
    fn flatten_mapping(
        mapping: &serde_yaml::Mapping,
        prefix: &str,
        table: &mut BTreeMap<String, String>,
    ) {
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                tracing::warn!(prefix, "skipping non-string document key");
                continue;
            };
            match value {
                serde_yaml::Value::Mapping(nested) => {
                    Self::flatten_mapping(nested, &format!("{prefix}{key}_"), table);
                }
                serde_yaml::Value::Null => {}
                other => {
                    let flattened = format!("{prefix}{key}").to_lowercase();
                    if flattened.chars().any(char::is_control) {
                        tracing::warn!(key = %flattened, "skipping key with control characters");
                        continue;
                    }
                    if let Some(text) = Self::leaf_text(other) {
                        table.insert(flattened, text);
                    }
                }
            }
        }
    }

    /// Renders a leaf value as text; sequences join their items with newlines.
    fn leaf_text(value: &serde_yaml::Value) -> Option<String> {
        match value {
            serde_yaml::Value::String(text) => Some(text.clone()),
            serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
            serde_yaml::Value::Number(number) => Some(number.to_string()),
            serde_yaml::Value::Sequence(items) => {
                let lines: Vec<String> =
                    items.iter().filter_map(|item| Self::leaf_text(item)).collect();
                Some(lines.join("\n"))
            }
            serde_yaml::Value::Null
            | serde_yaml::Value::Mapping(_)
            | serde_yaml::Value::Tagged(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
