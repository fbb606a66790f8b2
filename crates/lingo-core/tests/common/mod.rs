// crates/lingo-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Doubles
// Description: In-memory store and loopback bus for runtime tests.
// ============================================================================
//! ## Overview
//! Test doubles for the persistence and synchronization contracts: a
//! memory-backed [`LocaleStore`] and a loopback [`SyncBus`] that delivers
//! published envelopes synchronously to every subscriber.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    dead_code,
    reason = "Test-only doubles; not every test binary uses every helper."
)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use lingo_core::LocaleCode;
use lingo_core::LocaleStore;
use lingo_core::StoreError;
use lingo_core::SyncBus;
use lingo_core::SyncEnvelope;
use lingo_core::SyncHandler;
use lingo_core::UserId;

/// In-memory [`LocaleStore`] double with upsert semantics.
#[derive(Default)]
pub struct MemoryLocaleStore {
    /// Stored records.
    records: Mutex<HashMap<UserId, LocaleCode>>,
    /// Whether `close` was called.
    closed: AtomicBool,
}

impl MemoryLocaleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the stored record for `user` without going through the trait.
    pub fn stored(&self, user: UserId) -> Option<LocaleCode> {
        self.records.lock().unwrap().get(&user).cloned()
    }

    /// Seeds a durable record directly.
    pub fn seed(&self, user: UserId, locale: LocaleCode) {
        self.records.lock().unwrap().insert(user, locale);
    }
}

#[async_trait::async_trait]
impl LocaleStore for MemoryLocaleStore {
    async fn save(&self, user: UserId, locale: LocaleCode) -> Result<(), StoreError> {
        self.records.lock().unwrap().insert(user, locale);
        Ok(())
    }

    async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        Ok(self.records.lock().unwrap().get(&user).cloned())
    }

    async fn exists(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.records.lock().unwrap().contains_key(&user))
    }

    async fn remove(&self, user: UserId) -> Result<(), StoreError> {
        self.records.lock().unwrap().remove(&user);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Loopback [`SyncBus`] delivering envelopes synchronously to all handlers.
///
/// Publishes round-trip through the wire codec so tests exercise the exact
/// envelope contract.
#[derive(Default)]
pub struct LoopbackBus {
    /// Registered subscriber handlers.
    handlers: Mutex<Vec<SyncHandler>>,
    /// Enabled flag mirroring a connected transport.
    enabled: AtomicBool,
}

impl LoopbackBus {
    /// Creates an enabled loopback bus.
    pub fn new() -> Arc<Self> {
        let bus = Arc::new(Self::default());
        bus.enabled.store(true, Ordering::SeqCst);
        bus
    }
}

impl SyncBus for LoopbackBus {
    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn publish(&self, envelope: &SyncEnvelope) {
        if !self.enabled() {
            return;
        }
        let decoded = SyncEnvelope::decode(&envelope.encode()).expect("loopback envelope");
        for handler in self.handlers.lock().unwrap().iter() {
            handler(decoded.clone());
        }
    }

    fn subscribe(&self, handler: SyncHandler) {
        self.handlers.lock().unwrap().push(handler);
    }

    fn close(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.handlers.lock().unwrap().clear();
    }
}
