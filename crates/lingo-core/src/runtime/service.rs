// crates/lingo-core/src/runtime/service.rs
// ============================================================================
// Module: Language Service
// Description: Collaborator-facing context object over state and resolution.
// Purpose: Expose the public operation surface without global lookups.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`LanguageService`] is the explicit context object handed to every
//! collaborator: command handlers, session listeners, and placeholder
//! integrations all hold a reference instead of reaching for process-wide
//! state. It composes the locale state store, the two-tier resolver, and the
//! detection chain, and owns catalog reloads from the configured root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::catalog::CatalogError;
use crate::core::catalog::CatalogLoader;
use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::UserId;
use crate::interfaces::StoreError;
use crate::runtime::detect::LocaleDetector;
use crate::runtime::resolver::TranslationResolver;
use crate::runtime::state::SessionLocales;

// ============================================================================
// SECTION: Service
// ============================================================================

/// The collaborator-facing language service.
///
/// # Invariants
/// - Constructed once and passed by reference; no static global access.
/// - Synchronous operations never touch I/O.
pub struct LanguageService {
    /// Authoritative locale state.
    states: Arc<SessionLocales>,
    /// Two-tier cached resolver.
    resolver: Arc<TranslationResolver>,
    /// Client locale detection chain.
    detector: LocaleDetector,
    /// Catalog root directory for reloads.
    catalog_root: PathBuf,
}

impl LanguageService {
    /// Creates the service from its composed parts.
    #[must_use]
    pub fn new(
        states: Arc<SessionLocales>,
        resolver: Arc<TranslationResolver>,
        detector: LocaleDetector,
        catalog_root: PathBuf,
    ) -> Self {
        Self {
            states,
            resolver,
            detector,
            catalog_root,
        }
    }

    /// Resolves rendered text for `user` under their current locale.
    ///
    /// Users without a recorded locale resolve under the default locale.
    #[must_use]
    pub fn resolve(&self, user: UserId, key: &str) -> Arc<str> {
        let locale = self
            .states
            .get(user)
            .unwrap_or_else(|| self.resolver.default_locale().clone());
        self.resolver.resolve(user, &locale, key)
    }

    /// Resolves tier-1 text for contexts with no specific user.
    #[must_use]
    pub fn locale_text(&self, locale: &LocaleCode, key: &str) -> Arc<str> {
        self.resolver.locale_text(locale, key)
    }

    /// Sets the locale for `user`; durability and broadcast are asynchronous.
    pub fn set_locale(&self, user: UserId, locale: LocaleCode) {
        self.states.set(user, locale);
    }

    /// Returns the in-memory locale for `user`, if tracked.
    #[must_use]
    pub fn get_locale(&self, user: UserId) -> Option<LocaleCode> {
        self.states.get(user)
    }

    /// Reports whether `user` has an in-memory locale record.
    #[must_use]
    pub fn has_locale(&self, user: UserId) -> bool {
        self.states.has(user)
    }

    /// Loads the durable locale for `user`, populating memory when found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend read fails.
    pub async fn load_locale(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        self.states.load(user).await
    }

    /// Drops the in-memory record for `user` at session end.
    pub fn unload_locale(&self, user: UserId) {
        self.states.unload(user);
    }

    /// Re-persists the current in-memory locale for `user`, if any.
    pub fn save_locale(&self, user: UserId) {
        self.states.save(user);
    }

    /// Detects a locale for `user` through the capability-probe chain.
    ///
    /// The result always names an available catalog locale or the default.
    #[must_use]
    pub fn detect_locale(&self, user: UserId) -> LocaleCode {
        self.detector.detect(
            user,
            &self.resolver.available_locales(),
            self.resolver.default_locale(),
        )
    }

    /// Binds a display name to `user` for reverse lookup.
    pub fn bind_name(&self, name: &str, user: UserId) {
        self.states.bind_name(name, user);
    }

    /// Returns the user bound to `name`, if any.
    #[must_use]
    pub fn user_by_name(&self, name: &str) -> Option<UserId> {
        self.states.user_by_name(name)
    }

    /// Returns the locales of the published catalog.
    #[must_use]
    pub fn available_locales(&self) -> Vec<LocaleCode> {
        self.resolver.available_locales()
    }

    /// Returns the total translation count across locales.
    #[must_use]
    pub fn total_translation_count(&self) -> usize {
        self.resolver.total_translations()
    }

    /// Returns the configured default locale.
    #[must_use]
    pub fn default_locale(&self) -> &LocaleCode {
        self.resolver.default_locale()
    }

    /// Reloads the catalog wholesale from the configured root.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the root exists but cannot be listed;
    /// the previously published catalog stays in effect in that case.
    pub fn reload_catalog(&self) -> Result<(), CatalogError> {
        let catalog = CatalogLoader::load(&self.catalog_root)?;
        self.resolver.reload(catalog);
        Ok(())
    }

    /// Clears both resolver cache tiers.
    pub fn invalidate_caches(&self) {
        self.resolver.invalidate();
    }

    /// Closes the bus and the durable backend with a bounded drain.
    pub async fn shutdown(&self) {
        self.states.shutdown().await;
    }
}

impl std::fmt::Debug for LanguageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageService")
            .field("catalog_root", &self.catalog_root)
            .field("default_locale", self.resolver.default_locale())
            .finish_non_exhaustive()
    }
}
