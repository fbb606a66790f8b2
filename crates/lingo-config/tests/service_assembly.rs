// crates/lingo-config/tests/service_assembly.rs
// ============================================================================
// Module: Service Assembly Tests
// Description: Verifies build_service wires a working service from settings.
// ============================================================================
//! ## Overview
//! Assembles the full service from a TOML document and a catalog directory,
//! then exercises resolution, locale persistence, and catalog statistics
//! through the assembled surface.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::path::Path;

use lingo_config::Settings;
use lingo_config::build_service;
use lingo_core::LocaleCode;
use lingo_core::UserId;
use tokio::runtime::Handle;

/// Writes a catalog tree and returns settings rooted at it.
fn settings_with_catalog(dir: &Path) -> Settings {
    let catalog_root = dir.join("langs");
    let en = catalog_root.join("en_us");
    std::fs::create_dir_all(&en).expect("mkdir en_us");
    std::fs::write(en.join("example.yml"), "greeting: Hello\n").expect("write en_us");
    let fr = catalog_root.join("fr_fr");
    std::fs::create_dir_all(&fr).expect("mkdir fr_fr");
    std::fs::write(fr.join("example.yml"), "greeting: Bonjour\n").expect("write fr_fr");

    let document = format!(
        r#"
default_locale = "en_us"
catalog_root = "{root}"

[storage.file]
path = "{file}"
"#,
        root = catalog_root.display(),
        file = dir.join("players.yml").display()
    );
    Settings::from_toml_str(&document).expect("settings")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn assembled_service_resolves_and_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings_with_catalog(dir.path());

    let service =
        build_service(&settings, &Handle::current(), None, Vec::new()).expect("assemble");
    let user = UserId::new(uuid::Uuid::new_v4());

    assert_eq!(&*service.resolve(user, "greeting"), "Hello");
    service.set_locale(user, LocaleCode::new("fr_fr").expect("locale"));
    assert_eq!(&*service.resolve(user, "greeting"), "Bonjour");

    assert_eq!(service.total_translation_count(), 2);
    assert_eq!(
        service.available_locales(),
        vec![LocaleCode::new("en_us").expect("en"), LocaleCode::new("fr_fr").expect("fr")]
    );

    // Let the fire-and-forget save reach the store before the final flush.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    service.shutdown().await;
    let mirrored = std::fs::read_to_string(dir.path().join("players.yml")).expect("file");
    assert!(mirrored.contains("fr_fr"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn assembled_service_reloads_its_catalog_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings_with_catalog(dir.path());
    let service =
        build_service(&settings, &Handle::current(), None, Vec::new()).expect("assemble");
    let user = UserId::new(uuid::Uuid::new_v4());

    std::fs::write(dir.path().join("langs/en_us/example.yml"), "greeting: Howdy\n")
        .expect("rewrite");
    service.reload_catalog().expect("reload");
    assert_eq!(&*service.resolve(user, "greeting"), "Howdy");
}
