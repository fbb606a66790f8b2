// crates/lingo-core/tests/proptest_invariants.rs
// ============================================================================
// Module: Property Tests
// Description: Catalog key invariants and envelope codec round-trips.
// ============================================================================
//! ## Overview
//! Property checks for the two load-bearing invariants with wide input
//! spaces: catalog tables never publish malformed keys, and the sync envelope
//! codec round-trips every well-formed identifier pair.

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

use std::collections::BTreeMap;

use lingo_core::LocaleCode;
use lingo_core::RECOGNIZED_LOCALES;
use lingo_core::SyncEnvelope;
use lingo_core::TranslationCatalog;
use lingo_core::UserId;
use proptest::prelude::Strategy;
use proptest::prelude::any;
use proptest::prop_assert;
use proptest::prop_assert_eq;
use proptest::proptest;
use proptest::sample::select;

/// Strategy over recognized locale codes.
fn recognized_locale() -> impl Strategy<Value = LocaleCode> {
    select(RECOGNIZED_LOCALES).prop_map(|code| LocaleCode::new(code).expect("table code"))
}

proptest! {
    #[test]
    fn catalog_tables_publish_only_wellformed_keys(
        locale in recognized_locale(),
        entries in proptest::collection::btree_map(
            "[a-zA-Z_.\\x00-\\x1F]{1,24}",
            "\\PC{0,32}",
            0..16,
        ),
    ) {
        let mut tables = BTreeMap::new();
        tables.insert(locale.clone(), entries);
        let catalog = TranslationCatalog::from_tables(tables);
        for (key, _) in catalog.entries(&locale) {
            prop_assert!(!key.chars().any(char::is_control));
            let key_lower = key.to_lowercase();
            prop_assert_eq!(key_lower.as_str(), key);
        }
    }

    #[test]
    fn envelope_codec_round_trips(
        bytes in any::<[u8; 16]>(),
        locale in recognized_locale(),
    ) {
        let envelope = SyncEnvelope {
            id: UserId::new(uuid::Uuid::from_bytes(bytes)),
            locale,
        };
        let decoded = SyncEnvelope::decode(&envelope.encode()).expect("decode");
        prop_assert_eq!(decoded, envelope);
    }

    #[test]
    fn envelope_decode_never_panics_on_noise(payload in "\\PC{0,64}") {
        let _ = SyncEnvelope::decode(&payload);
    }
}
