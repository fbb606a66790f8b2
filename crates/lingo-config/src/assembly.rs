// crates/lingo-config/src/assembly.rs
// ============================================================================
// Module: Service Assembly
// Description: Builds the store, bus, and language service from settings.
// Purpose: One composition root; backend failures fall back, never abort.
// Dependencies: lingo-core, lingo-store-*, lingo-sync, tokio, tracing
// ============================================================================

//! ## Overview
//! Assembly turns validated [`Settings`] into a running [`LanguageService`].
//! A SQL backend that cannot be constructed (unreachable host, bad
//! credentials, unopenable file) is logged prominently and replaced by the
//! file-backed store; startup never aborts on storage. The sync bus is wired
//! to the state store here so received envelopes update already-tracked users.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lingo_core::CatalogLoader;
use lingo_core::ClientLocaleProbe;
use lingo_core::LanguageService;
use lingo_core::LocaleDetector;
use lingo_core::LocaleStore;
use lingo_core::PlaceholderExpander;
use lingo_core::ResolverConfig;
use lingo_core::SessionLocales;
use lingo_core::SyncBus;
use lingo_core::TranslationResolver;
use lingo_store_file::FileLocaleStore;
use lingo_store_file::FileStoreConfig;
use lingo_store_postgres::PostgresLocaleStore;
use lingo_store_sqlite::SqliteLocaleStore;
use lingo_sync::RedisSyncBus;
use tokio::runtime::Handle;

use crate::settings::ConfigError;
use crate::settings::Settings;
use crate::settings::StorageBackend;

// ============================================================================
// SECTION: Store Construction
// ============================================================================

/// Builds the configured durable store, falling back to the file store.
///
/// # Errors
///
/// Returns [`ConfigError`] only when the file-backed fallback itself cannot
/// be opened; configured SQL backends never abort startup.
pub fn build_store(
    settings: &Settings,
    handle: &Handle,
) -> Result<Arc<dyn LocaleStore>, ConfigError> {
    match settings.storage.backend {
        StorageBackend::File => open_file_store(settings, handle),
        StorageBackend::Sqlite => {
            let Some(config) = &settings.storage.sqlite else {
                // Unreachable after validation; treat like a backend failure.
                tracing::error!("sqlite backend selected without a sqlite section");
                return open_file_store(settings, handle);
            };
            match SqliteLocaleStore::open(config) {
                Ok(store) => Ok(Arc::new(store)),
                Err(err) => {
                    tracing::error!(%err, "sqlite store unavailable; falling back to file store");
                    open_file_store(settings, handle)
                }
            }
        }
        StorageBackend::Postgres => {
            let Some(config) = &settings.storage.postgres else {
                tracing::error!("postgres backend selected without a postgres section");
                return open_file_store(settings, handle);
            };
            match PostgresLocaleStore::new(config) {
                Ok(store) => Ok(Arc::new(store)),
                Err(err) => {
                    tracing::error!(%err, "postgres store unavailable; falling back to file store");
                    open_file_store(settings, handle)
                }
            }
        }
    }
}

/// Opens the file-backed store from the file section.
fn open_file_store(
    settings: &Settings,
    handle: &Handle,
) -> Result<Arc<dyn LocaleStore>, ConfigError> {
    let config = FileStoreConfig {
        path: settings.storage.file.path.clone(),
        flush_interval: settings.file_flush_interval(),
    };
    let store = FileLocaleStore::open(&config, handle)
        .map_err(|err| ConfigError::Invalid(format!("file store unavailable: {err}")))?;
    Ok(Arc::new(store))
}

// ============================================================================
// SECTION: Bus Construction
// ============================================================================

/// Builds the sync bus when synchronization is enabled.
///
/// An invalid connection URL is logged and disables synchronization rather
/// than failing assembly.
#[must_use]
pub fn build_bus(settings: &Settings, handle: &Handle) -> Option<Arc<dyn SyncBus>> {
    if !settings.sync.enabled {
        return None;
    }
    match RedisSyncBus::connect(&settings.sync, handle.clone()) {
        Ok(bus) => Some(Arc::new(bus)),
        Err(err) => {
            tracing::error!(%err, "sync bus unavailable; continuing without synchronization");
            None
        }
    }
}

// ============================================================================
// SECTION: Service Assembly
// ============================================================================

/// Builds the complete language service from validated settings.
///
/// The catalog is loaded from the configured root, the durable store is
/// constructed with fallback, the bus subscription is wired to the state
/// store, and the detection chain and expander are taken from the host.
///
/// # Errors
///
/// Returns [`ConfigError`] when the catalog root is unreadable or the
/// file-backed fallback store cannot be opened.
pub fn build_service(
    settings: &Settings,
    handle: &Handle,
    expander: Option<Arc<dyn PlaceholderExpander>>,
    probes: Vec<Box<dyn ClientLocaleProbe>>,
) -> Result<LanguageService, ConfigError> {
    let catalog = CatalogLoader::load(&settings.catalog_root)
        .map_err(|err| ConfigError::Invalid(err.to_string()))?;
    let resolver = Arc::new(TranslationResolver::new(
        catalog,
        ResolverConfig {
            default_locale: settings.default_locale()?,
            not_found_template: settings.messages.not_found.clone(),
            resolved_capacity: settings.performance.translation_cache_size,
            resolved_ttl: settings.translation_cache_ttl(),
            parsed_capacity: settings.performance.parsed_message_cache_size,
            parsed_ttl: settings.parsed_message_cache_ttl(),
        },
        expander,
    ));
    let store = build_store(settings, handle)?;
    let bus = build_bus(settings, handle);
    let states = Arc::new(SessionLocales::new(store, bus.clone(), handle.clone()));
    if let Some(bus) = bus {
        let receiver = Arc::clone(&states);
        bus.subscribe(Arc::new(move |envelope| receiver.apply_remote(&envelope)));
    }
    Ok(LanguageService::new(
        states,
        resolver,
        LocaleDetector::new(probes),
        settings.catalog_root.clone(),
    ))
}
