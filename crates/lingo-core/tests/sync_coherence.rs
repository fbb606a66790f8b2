// crates/lingo-core/tests/sync_coherence.rs
// ============================================================================
// Module: Cross-Instance Coherence Tests
// Description: Verifies locale propagation between cooperating instances.
// ============================================================================
//! ## Overview
//! Two state stores share one loopback bus standing in for the pub/sub
//! transport. A set on instance A must become visible on instance B only for
//! users B already tracks; untracked users must stay absent so unrelated
//! traffic cannot grow memory.

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

mod common;

use std::sync::Arc;

use common::LoopbackBus;
use common::MemoryLocaleStore;
use lingo_core::LocaleCode;
use lingo_core::SessionLocales;
use lingo_core::SyncBus;
use lingo_core::UserId;
use tokio::runtime::Handle;

fn locale(code: &str) -> LocaleCode {
    LocaleCode::new(code).expect("valid locale code")
}

/// Builds an instance wired to the shared bus, subscribing its state store.
fn instance(bus: &Arc<LoopbackBus>) -> Arc<SessionLocales> {
    let store = Arc::new(MemoryLocaleStore::new());
    let states = Arc::new(SessionLocales::new(
        store,
        Some(Arc::clone(bus) as _),
        Handle::current(),
    ));
    let receiver = Arc::clone(&states);
    bus.subscribe(Arc::new(move |envelope| receiver.apply_remote(&envelope)));
    states
}

#[tokio::test]
async fn tracked_user_on_other_instance_observes_the_change() {
    let bus = LoopbackBus::new();
    let instance_a = instance(&bus);
    let instance_b = instance(&bus);
    let user = UserId::new(uuid::Uuid::new_v4());

    // B tracks the user before A changes the locale.
    instance_b.set(user, locale("en_us"));
    instance_a.set(user, locale("fr_fr"));

    assert_eq!(instance_b.get(user), Some(locale("fr_fr")));
}

#[tokio::test]
async fn untracked_user_stays_absent_on_other_instances() {
    let bus = LoopbackBus::new();
    let instance_a = instance(&bus);
    let instance_b = instance(&bus);
    let user = UserId::new(uuid::Uuid::new_v4());

    instance_a.set(user, locale("fr_fr"));

    assert_eq!(instance_b.get(user), None);
    assert!(!instance_b.has(user));
}

#[tokio::test]
async fn last_delivered_message_wins_on_the_receiver() {
    let bus = LoopbackBus::new();
    let instance_a = instance(&bus);
    let instance_b = instance(&bus);
    let user = UserId::new(uuid::Uuid::new_v4());

    instance_b.set(user, locale("en_us"));
    instance_a.set(user, locale("fr_fr"));
    instance_a.set(user, locale("de_de"));

    assert_eq!(instance_b.get(user), Some(locale("de_de")));
}

#[tokio::test]
async fn closed_bus_stops_propagation() {
    let bus = LoopbackBus::new();
    let instance_a = instance(&bus);
    let instance_b = instance(&bus);
    let user = UserId::new(uuid::Uuid::new_v4());

    instance_b.set(user, locale("en_us"));
    bus.close();
    instance_a.set(user, locale("fr_fr"));

    assert_eq!(instance_b.get(user), Some(locale("en_us")));
}
