// crates/lingo-core/src/runtime/state.rs
// ============================================================================
// Module: Locale State Store
// Description: Authoritative in-memory user->locale state with async durability.
// Purpose: Serve synchronous reads while persisting and broadcasting changes.
// Dependencies: crate::core, crate::interfaces, dashmap, tokio, tracing
// ============================================================================

//! ## Overview
//! [`SessionLocales`] owns the authoritative in-memory map of
//! currently-relevant users to their locale. Reads are synchronous and memory
//! only; writes update memory first and then enqueue the durable save and the
//! sync broadcast as fire-and-forget tasks, so a set followed by a get on any
//! thread observes the new value. Records exist only for users of interest:
//! they appear on first load or set and disappear on [`SessionLocales::unload`]
//! when the session ends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dashmap::DashMap;
use tokio::runtime::Handle;

use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::UserId;
use crate::interfaces::LocaleStore;
use crate::interfaces::StoreError;
use crate::interfaces::SyncBus;
use crate::interfaces::SyncEnvelope;

// ============================================================================
// SECTION: State Store
// ============================================================================

/// Authoritative in-memory locale state backed by a durable store.
///
/// # Invariants
/// - The in-memory map is the source of truth; durable writes are
///   asynchronous and their failures never affect user-visible behavior.
/// - Map operations are independently atomic per entry; no cross-entry
///   transactions exist.
pub struct SessionLocales {
    /// Current locale per tracked user.
    locales: DashMap<UserId, LocaleCode>,
    /// Lowercased display name -> user index for O(1) reverse lookup.
    name_index: DashMap<String, UserId>,
    /// Durable backend reached only through this store.
    store: Arc<dyn LocaleStore>,
    /// Optional cross-instance synchronization bus.
    bus: Option<Arc<dyn SyncBus>>,
    /// Runtime handle used to spawn fire-and-forget persistence work.
    handle: Handle,
}

impl SessionLocales {
    /// Creates a state store over `store`, broadcasting on `bus` when given.
    ///
    /// The `handle` is injected explicitly so the store never reaches for
    /// ambient runtime state.
    #[must_use]
    pub fn new(store: Arc<dyn LocaleStore>, bus: Option<Arc<dyn SyncBus>>, handle: Handle) -> Self {
        Self {
            locales: DashMap::new(),
            name_index: DashMap::new(),
            store,
            bus,
            handle,
        }
    }

    /// Returns the in-memory locale for `user`, if tracked.
    #[must_use]
    pub fn get(&self, user: UserId) -> Option<LocaleCode> {
        self.locales.get(&user).map(|entry| entry.value().clone())
    }

    /// Reports whether `user` is tracked in memory.
    ///
    /// This does not consult the durable backend: a user whose record exists
    /// only durably reads as absent until loaded.
    #[must_use]
    pub fn has(&self, user: UserId) -> bool {
        self.locales.contains_key(&user)
    }

    /// Sets the locale for `user`.
    ///
    /// Memory is updated synchronously before the durable save and the sync
    /// broadcast are enqueued; both are fire-and-forget and their failures
    /// are logged, never surfaced.
    pub fn set(&self, user: UserId, locale: LocaleCode) {
        self.locales.insert(user, locale.clone());
        self.spawn_save(user, locale.clone());
        if let Some(bus) = &self.bus
            && bus.enabled()
        {
            bus.publish(&SyncEnvelope {
                id: user,
                locale,
            });
        }
    }

    /// Fetches the durable locale for `user`, populating memory when found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend read fails; memory is left
    /// untouched in that case.
    pub async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        let loaded = self.store.load(user).await?;
        if let Some(locale) = &loaded {
            self.locales.insert(user, locale.clone());
            tracing::debug!(%user, locale = %locale, "loaded locale from durable store");
        }
        Ok(loaded)
    }

    /// Removes the in-memory record and name bindings for `user`.
    ///
    /// Durable storage is not touched; the record reappears on the next load.
    pub fn unload(&self, user: UserId) {
        self.locales.remove(&user);
        self.name_index.retain(|_, bound| *bound != user);
    }

    /// Re-persists the current in-memory value for `user`, if present.
    ///
    /// Used for explicit checkpointing; fire-and-forget like [`Self::set`].
    pub fn save(&self, user: UserId) {
        if let Some(locale) = self.get(user) {
            self.spawn_save(user, locale);
        }
    }

    /// Binds a display name to `user` for reverse lookup.
    ///
    /// Names are matched case-insensitively; rebinding replaces the previous
    /// owner of the name.
    pub fn bind_name(&self, name: &str, user: UserId) {
        self.name_index.insert(name.to_lowercase(), user);
    }

    /// Returns the user bound to `name`, if any.
    #[must_use]
    pub fn user_by_name(&self, name: &str) -> Option<UserId> {
        self.name_index.get(&name.to_lowercase()).map(|entry| *entry.value())
    }

    /// Applies a locale change received from another instance.
    ///
    /// Only already-tracked users are updated; an envelope for an untracked
    /// user is ignored so unrelated instances' traffic cannot grow memory.
    pub fn apply_remote(&self, envelope: &SyncEnvelope) {
        if let Some(mut entry) = self.locales.get_mut(&envelope.id) {
            *entry.value_mut() = envelope.locale.clone();
            tracing::debug!(user = %envelope.id, locale = %envelope.locale, "applied remote locale update");
        }
    }

    /// Closes the bus and the durable backend with a bounded drain.
    ///
    /// Pending fire-and-forget saves may complete or fail silently; the
    /// backend's own close flushes whatever it still holds.
    pub async fn shutdown(&self) {
        if let Some(bus) = &self.bus {
            bus.close();
        }
        if let Err(err) = self.store.close().await {
            tracing::warn!(%err, "locale store close reported an error");
        }
    }

    /// Enqueues a durable save for `user`, logging any failure.
    fn spawn_save(&self, user: UserId, locale: LocaleCode) {
        let store = Arc::clone(&self.store);
        self.handle.spawn(async move {
            if let Err(err) = store.save(user, locale.clone()).await {
                tracing::warn!(%user, locale = %locale, %err, "durable locale save failed");
            }
        });
    }
}

impl std::fmt::Debug for SessionLocales {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLocales")
            .field("tracked", &self.locales.len())
            .field("names", &self.name_index.len())
            .field("sync", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}
