// crates/lingo-core/src/lib.rs
// ============================================================================
// Module: Lingo Core
// Description: Core types, contracts, and runtime for per-user locale text.
// Purpose: Crate root re-exporting the public surface.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! Lingo resolves user-facing text by per-user locale for live, highly
//! concurrent session services. This crate holds the catalog loader, the
//! locale state store, the two-tier translation resolver, and the contracts
//! implemented by the store and synchronization crates. It is an
//! eventually-consistent, best-effort cache-coherence layer tuned for low
//! read latency, not a general-purpose i18n library.

pub mod core;
pub mod interfaces;
pub mod runtime;

pub use crate::core::catalog::CatalogError;
pub use crate::core::catalog::CatalogLoader;
pub use crate::core::catalog::TranslationCatalog;
pub use crate::core::identifiers::IdentifierError;
pub use crate::core::identifiers::LocaleCode;
pub use crate::core::identifiers::RECOGNIZED_LOCALES;
pub use crate::core::identifiers::UserId;
pub use crate::interfaces::LocaleStore;
pub use crate::interfaces::PlaceholderExpander;
pub use crate::interfaces::StoreError;
pub use crate::interfaces::SyncBus;
pub use crate::interfaces::SyncEnvelope;
pub use crate::interfaces::SyncError;
pub use crate::interfaces::SyncHandler;
pub use crate::runtime::detect::ClientLocaleProbe;
pub use crate::runtime::detect::LocaleDetector;
pub use crate::runtime::resolver::ResolverConfig;
pub use crate::runtime::resolver::TranslationResolver;
pub use crate::runtime::service::LanguageService;
pub use crate::runtime::state::SessionLocales;
