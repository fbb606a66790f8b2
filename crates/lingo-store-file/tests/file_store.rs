// crates/lingo-store-file/tests/file_store.rs
// ============================================================================
// Module: File Store Tests
// Description: Verifies debounced persistence and lenient opening.
// ============================================================================
//! ## Overview
//! Exercises the file store contract: memory-first reads, dirty-flag
//! flushing, final flush on close, idempotent close, and lenient handling of
//! malformed existing documents.

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

use std::time::Duration;

use lingo_core::LocaleCode;
use lingo_core::LocaleStore;
use lingo_core::StoreError;
use lingo_core::UserId;
use lingo_store_file::FileLocaleStore;
use lingo_store_file::FileStoreConfig;
use tokio::runtime::Handle;

fn locale(code: &str) -> LocaleCode {
    LocaleCode::new(code).expect("valid locale code")
}

fn user() -> UserId {
    UserId::new(uuid::Uuid::new_v4())
}

fn config(path: std::path::PathBuf) -> FileStoreConfig {
    FileStoreConfig {
        path,
        flush_interval: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn save_then_load_round_trips_in_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        FileLocaleStore::open(&config(dir.path().join("players.yml")), &Handle::current())
            .expect("open");
    let u = user();

    store.save(u, locale("fr_fr")).await.expect("save");
    assert_eq!(store.load(u).await.expect("load"), Some(locale("fr_fr")));
    assert!(store.exists(u).await.expect("exists"));
}

#[tokio::test]
async fn save_is_upsert_last_write_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        FileLocaleStore::open(&config(dir.path().join("players.yml")), &Handle::current())
            .expect("open");
    let u = user();

    store.save(u, locale("fr_fr")).await.expect("save 1");
    store.save(u, locale("de_de")).await.expect("save 2");
    assert_eq!(store.load(u).await.expect("load"), Some(locale("de_de")));
}

#[tokio::test]
async fn close_flushes_and_a_reopen_reads_the_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("players.yml");
    let u = user();

    let store = FileLocaleStore::open(&config(path.clone()), &Handle::current()).expect("open");
    store.save(u, locale("pt_br")).await.expect("save");
    store.close().await.expect("close");

    let reopened = FileLocaleStore::open(&config(path), &Handle::current()).expect("reopen");
    assert_eq!(reopened.load(u).await.expect("load"), Some(locale("pt_br")));
}

#[tokio::test]
async fn periodic_flusher_writes_while_dirty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("players.yml");
    let store = FileLocaleStore::open(
        &FileStoreConfig {
            path: path.clone(),
            flush_interval: Duration::from_millis(20),
        },
        &Handle::current(),
    )
    .expect("open");
    let u = user();

    store.save(u, locale("ja_jp")).await.expect("save");
    let mut flushed = false;
    for _ in 0_u32..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if std::fs::read_to_string(&path).is_ok_and(|content| content.contains("ja_jp")) {
            flushed = true;
            break;
        }
    }
    assert!(flushed, "periodic flush never reached disk");
}

#[tokio::test]
async fn remove_deletes_the_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        FileLocaleStore::open(&config(dir.path().join("players.yml")), &Handle::current())
            .expect("open");
    let u = user();

    store.save(u, locale("ko_kr")).await.expect("save");
    store.remove(u).await.expect("remove");
    assert_eq!(store.load(u).await.expect("load"), None);
    assert!(!store.exists(u).await.expect("exists"));
}

#[tokio::test]
async fn malformed_existing_file_opens_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("players.yml");
    std::fs::write(&path, "not: [valid").expect("write garbage");

    let store = FileLocaleStore::open(&config(path), &Handle::current()).expect("open");
    assert_eq!(store.load(user()).await.expect("load"), None);
}

#[tokio::test]
async fn invalid_user_id_entries_are_skipped_on_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("players.yml");
    let u = user();
    std::fs::write(&path, format!("not-a-uuid: en_us\n{u}: th_th\n")).expect("seed file");

    let store = FileLocaleStore::open(&config(path), &Handle::current()).expect("open");
    assert_eq!(store.load(u).await.expect("load"), Some(locale("th_th")));
}

#[tokio::test]
async fn close_is_idempotent_and_rejects_later_operations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        FileLocaleStore::open(&config(dir.path().join("players.yml")), &Handle::current())
            .expect("open");

    store.close().await.expect("close 1");
    store.close().await.expect("close 2");
    assert!(matches!(store.save(user(), locale("en_us")).await, Err(StoreError::Closed)));
}
