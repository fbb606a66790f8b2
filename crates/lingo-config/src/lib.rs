// crates/lingo-config/src/lib.rs
// ============================================================================
// Module: Lingo Config
// Description: Configuration model, validation, and service assembly.
// Purpose: Crate root re-exporting the settings and assembly surface.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! This crate owns the canonical configuration model for Lingo and the
//! composition root that turns validated settings into a running service:
//! storage backend selection with file-backed fallback, optional sync bus
//! wiring, and resolver construction.

pub mod assembly;
pub mod settings;

pub use crate::assembly::build_bus;
pub use crate::assembly::build_service;
pub use crate::assembly::build_store;
pub use crate::settings::ConfigError;
pub use crate::settings::DetectionSettings;
pub use crate::settings::FileStorageSettings;
pub use crate::settings::MessagesSettings;
pub use crate::settings::PerformanceSettings;
pub use crate::settings::Settings;
pub use crate::settings::StorageBackend;
pub use crate::settings::StorageSettings;
