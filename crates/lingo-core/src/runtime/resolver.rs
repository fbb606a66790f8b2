// crates/lingo-core/src/runtime/resolver.rs
// ============================================================================
// Module: Translation Resolver
// Description: Two-tier cached translation resolution with placeholder passes.
// Purpose: Serve rendered text on the synchronous request path without I/O.
// Dependencies: crate::core, crate::interfaces, lru, regex, sha2
// ============================================================================

//! ## Overview
//! Resolution runs in two cached tiers. Tier 1 holds markup-normalized text
//! per `(locale, key)` with an access-time bound; entries record whether any
//! placeholder token survived normalization, and placeholder-free entries are
//! returned without further allocation or lookup. Tier 2 holds fully
//! substituted per-user text keyed by `(user, locale, key, fingerprint)` with
//! a write-time bound; the fingerprint ties a parsed entry to the tier-1
//! content it was computed from, so a tier-1 change is picked up once the
//! fingerprint changes. Both tiers are pure derived state: eviction at any
//! moment only costs a recomputation, never a wrong answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use lru::LruCache;
use regex::Regex;
use sha2::Digest;
use sha2::Sha256;

use crate::core::catalog::TranslationCatalog;
use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::UserId;
use crate::core::markup;
use crate::interfaces::PlaceholderExpander;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Any placeholder token, internal or external.
#[allow(clippy::unwrap_used, reason = "Pattern is a compile-time constant.")]
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[^%]+%").unwrap());

/// Internal translation placeholder, resolved from the catalog itself.
#[allow(clippy::unwrap_used, reason = "Pattern is a compile-time constant.")]
static LANG_PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%lang_([^%]+)%").unwrap());

// ============================================================================
// SECTION: Config
// ============================================================================

/// Resolver and cache configuration.
///
/// # Invariants
/// - Capacities of zero are clamped to one; a cache always exists.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Locale used when a user has no recorded choice and as fallback.
    pub default_locale: LocaleCode,
    /// Template for missing translations; `{key}` is substituted.
    pub not_found_template: String,
    /// Maximum tier-1 (resolved translation) entries.
    pub resolved_capacity: usize,
    /// Tier-1 access-expiry duration.
    pub resolved_ttl: Duration,
    /// Maximum tier-2 (parsed message) entries.
    pub parsed_capacity: usize,
    /// Tier-2 write-expiry duration.
    pub parsed_ttl: Duration,
}

// ============================================================================
// SECTION: Cache Entries
// ============================================================================

/// Tier-1 value: normalized content plus precomputed attributes.
#[derive(Debug)]
struct ResolvedTranslation {
    /// Markup-normalized content, shared without copying.
    content: Arc<str>,
    /// Whether any placeholder token survived normalization.
    has_placeholders: bool,
    /// Stable digest of `content`, part of every tier-2 key.
    fingerprint: u64,
}

/// Tier-1 cache slot with its last-access instant.
#[derive(Debug)]
struct ResolvedSlot {
    /// Shared translation value.
    value: Arc<ResolvedTranslation>,
    /// Last access, for the access-expiry bound.
    touched: Instant,
}

/// Tier-2 cache key over user, locale, key, and source fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ParsedKey {
    /// User the text was substituted for.
    user: UserId,
    /// Locale the text resolved under.
    locale: LocaleCode,
    /// Lowercased translation key.
    key: String,
    /// Fingerprint of the tier-1 content at lookup time.
    fingerprint: u64,
}

/// Tier-2 cache slot with its write instant.
#[derive(Debug)]
struct ParsedSlot {
    /// Fully substituted text.
    text: Arc<str>,
    /// Write instant, for the write-expiry bound.
    written: Instant,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Two-tier cached translation resolver.
///
/// # Invariants
/// - Never performs I/O; the catalog is swapped in wholesale by the caller.
/// - Cache eviction or [`TranslationResolver::invalidate`] concurrent with a
///   resolution yields either the evicted or a rebuilt entry, never a crash.
pub struct TranslationResolver {
    /// Published catalog; replaced atomically on reload.
    catalog: RwLock<Arc<TranslationCatalog>>,
    /// Resolver configuration.
    config: ResolverConfig,
    /// Tier-1 cache of resolved translations.
    resolved: Mutex<LruCache<(LocaleCode, String), ResolvedSlot>>,
    /// Tier-2 cache of parsed per-user messages.
    parsed: Mutex<LruCache<ParsedKey, ParsedSlot>>,
    /// Optional external placeholder collaborator.
    expander: Option<Arc<dyn PlaceholderExpander>>,
}

impl TranslationResolver {
    /// Creates a resolver over an initial catalog.
    #[must_use]
    pub fn new(
        catalog: TranslationCatalog,
        config: ResolverConfig,
        expander: Option<Arc<dyn PlaceholderExpander>>,
    ) -> Self {
        let resolved_capacity = cache_capacity(config.resolved_capacity);
        let parsed_capacity = cache_capacity(config.parsed_capacity);
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            config,
            resolved: Mutex::new(LruCache::new(resolved_capacity)),
            parsed: Mutex::new(LruCache::new(parsed_capacity)),
            expander,
        }
    }

    /// Resolves fully substituted text for `user` under `locale`.
    ///
    /// Placeholder-free entries return straight from tier 1; otherwise the
    /// per-user tier-2 result is served or computed: internal `%lang_<key>%`
    /// tokens substitute literally from the raw resolution path, and any
    /// remaining tokens delegate to the external expander when one is
    /// configured.
    #[must_use]
    pub fn resolve(&self, user: UserId, locale: &LocaleCode, key: &str) -> Arc<str> {
        let entry = self.cached_resolved(locale, key);
        if !entry.has_placeholders {
            return Arc::clone(&entry.content);
        }
        let parsed_key = ParsedKey {
            user,
            locale: locale.clone(),
            key: key.to_lowercase(),
            fingerprint: entry.fingerprint,
        };
        {
            let mut cache = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = cache.get(&parsed_key) {
                if slot.written.elapsed() < self.config.parsed_ttl {
                    return Arc::clone(&slot.text);
                }
                cache.pop(&parsed_key);
            }
        }
        let mut result = self.expand_internal(locale, &entry.content);
        if let Some(expander) = &self.expander
            && PLACEHOLDER_PATTERN.is_match(&result)
        {
            result = expander.expand(user, &result);
        }
        let text: Arc<str> = result.into();
        let mut cache = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(
            parsed_key,
            ParsedSlot {
                text: Arc::clone(&text),
                written: Instant::now(),
            },
        );
        text
    }

    /// Resolves tier-1 content for contexts without a specific user.
    #[must_use]
    pub fn locale_text(&self, locale: &LocaleCode, key: &str) -> Arc<str> {
        Arc::clone(&self.cached_resolved(locale, key).content)
    }

    /// Clears both cache tiers.
    ///
    /// Safe concurrently with in-flight resolutions; they recompute on miss.
    pub fn invalidate(&self) {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.parsed.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Publishes a new catalog and clears both tiers.
    ///
    /// A resolution racing the swap may compute against either catalog
    /// generation; any stale tier-2 text re-cached during the race expires at
    /// its write bound.
    pub fn reload(&self, catalog: TranslationCatalog) {
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
        self.invalidate();
    }

    /// Returns the locales of the published catalog.
    #[must_use]
    pub fn available_locales(&self) -> Vec<LocaleCode> {
        self.current_catalog().locales()
    }

    /// Returns the total translation count of the published catalog.
    #[must_use]
    pub fn total_translations(&self) -> usize {
        self.current_catalog().total_translations()
    }

    /// Returns the configured default locale.
    #[must_use]
    pub const fn default_locale(&self) -> &LocaleCode {
        &self.config.default_locale
    }

    /// Returns a handle to the currently published catalog.
    fn current_catalog(&self) -> Arc<TranslationCatalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the tier-1 entry for `(locale, key)`, computing it on miss.
    ///
    /// Fallback chain: the requested locale's table, then the default
    /// locale's, then the not-found template with the key substituted. The
    /// synthesized not-found text is cached like any other entry.
    fn cached_resolved(&self, locale: &LocaleCode, key: &str) -> Arc<ResolvedTranslation> {
        let cache_key = (locale.clone(), key.to_lowercase());
        {
            let mut cache = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = cache.get_mut(&cache_key) {
                if slot.touched.elapsed() < self.config.resolved_ttl {
                    slot.touched = Instant::now();
                    return Arc::clone(&slot.value);
                }
                cache.pop(&cache_key);
            }
        }
        let catalog = self.current_catalog();
        let raw = catalog
            .text(locale, &cache_key.1)
            .or_else(|| catalog.text(&self.config.default_locale, &cache_key.1))
            .map_or_else(
                || self.config.not_found_template.replace("{key}", key),
                str::to_owned,
            );
        let content: Arc<str> = markup::normalize(&raw).into();
        let value = Arc::new(ResolvedTranslation {
            has_placeholders: PLACEHOLDER_PATTERN.is_match(&content),
            fingerprint: fingerprint(&content),
            content,
        });
        let mut cache = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(
            cache_key,
            ResolvedSlot {
                value: Arc::clone(&value),
                touched: Instant::now(),
            },
        );
        value
    }

    /// Substitutes internal `%lang_<key>%` tokens from the raw path.
    ///
    /// Replacement text is inserted literally; the engine interprets no
    /// metacharacters in substituted content. This never re-enters
    /// [`Self::resolve`], so internal lookups add no tier-2 bookkeeping.
    fn expand_internal(&self, locale: &LocaleCode, text: &str) -> String {
        LANG_PLACEHOLDER_PATTERN
            .replace_all(text, |captures: &regex::Captures<'_>| {
                self.cached_resolved(locale, &captures[1]).content.to_string()
            })
            .into_owned()
    }
}

impl std::fmt::Debug for TranslationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationResolver")
            .field("default_locale", &self.config.default_locale)
            .field("expander", &self.expander.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Clamps a configured capacity to a valid cache size.
fn cache_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Computes the stable 64-bit content fingerprint.
fn fingerprint(content: &str) -> u64 {
    let digest = Sha256::digest(content.as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
