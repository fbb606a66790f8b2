// crates/lingo-store-file/src/lib.rs
// ============================================================================
// Module: File Locale Store
// Description: LocaleStore backed by a YAML document mirrored in memory.
// Purpose: Always-available durable backend and fallback of last resort.
// Dependencies: lingo-core, serde_yaml, tokio, tracing
// ============================================================================

//! ## Overview
//! The file store keeps the whole user->locale document in memory and mirrors
//! it to one YAML file. Mutations mark a dirty flag instead of writing
//! through; a background task flushes on a fixed interval while dirty, and
//! `close` performs a final flush. Every read and mutation of the in-memory
//! document holds the same lock the flusher holds while serializing, so a
//! flush never observes a torn document.
//!
//! This is the fallback of last resort when a configured SQL backend cannot
//! be constructed, so opening is deliberately lenient: a malformed existing
//! file is logged and treated as empty rather than refusing to start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lingo_core::LocaleCode;
use lingo_core::LocaleStore;
use lingo_core::StoreError;
use lingo_core::UserId;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default interval between dirty-flag flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the file-backed locale store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path of the mirrored YAML document.
    pub path: PathBuf,
    /// Fixed interval between dirty flushes.
    pub flush_interval: Duration,
}

impl FileStoreConfig {
    /// Creates a configuration with the default flush interval.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Shared state between the store handle and the flusher task.
struct Inner {
    /// Path of the mirrored document.
    path: PathBuf,
    /// In-memory document: hyphenated user id -> locale code.
    document: tokio::sync::Mutex<BTreeMap<String, String>>,
    /// Whether memory has diverged from disk.
    dirty: AtomicBool,
    /// Whether the store has been closed.
    closed: AtomicBool,
}

impl Inner {
    /// Serializes the document and writes it to disk, clearing the dirty flag.
    ///
    /// The document lock is held across the write so concurrent mutations
    /// cannot produce a torn file.
    async fn flush(&self) -> Result<(), StoreError> {
        let document = self.document.lock().await;
        let payload = serde_yaml::to_string(&*document)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// File-backed [`LocaleStore`] with debounced writes.
///
/// # Invariants
/// - The in-memory document is authoritative between flushes.
/// - `close` is idempotent and performs a final synchronous flush.
pub struct FileLocaleStore {
    /// State shared with the flusher task.
    inner: Arc<Inner>,
    /// Background flusher, taken on close.
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl FileLocaleStore {
    /// Opens the store, reading any existing document, and starts the flusher.
    ///
    /// Entries with unparseable user ids and malformed documents are skipped
    /// with a warning; the fallback of last resort must always come up.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the parent directory cannot be created.
    pub fn open(config: &FileStoreConfig, handle: &Handle) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        let document = Self::read_document(&config.path);
        let inner = Arc::new(Inner {
            path: config.path.clone(),
            document: tokio::sync::Mutex::new(document),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let flusher = Self::spawn_flusher(&inner, config.flush_interval, handle);
        Ok(Self {
            inner,
            flusher: Mutex::new(Some(flusher)),
        })
    }

    /// Reads and filters the existing document, tolerating malformed input.
    fn read_document(path: &Path) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "locale file unreadable; starting empty");
                return BTreeMap::new();
            }
        };
        let parsed: BTreeMap<String, String> = match serde_yaml::from_str(&content) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "locale file malformed; starting empty");
                return BTreeMap::new();
            }
        };
        parsed
            .into_iter()
            .filter(|(key, _)| {
                let valid = UserId::parse(key).is_ok();
                if !valid {
                    tracing::warn!(entry = %key, "skipping locale record with invalid user id");
                }
                valid
            })
            .collect()
    }

    /// Starts the fixed-interval flusher task.
    fn spawn_flusher(inner: &Arc<Inner>, interval: Duration, handle: &Handle) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if inner.closed.load(Ordering::SeqCst) {
                    break;
                }
                if inner.dirty.load(Ordering::SeqCst)
                    && let Err(err) = inner.flush().await
                {
                    tracing::warn!(%err, "periodic locale flush failed");
                }
            }
        })
    }

    /// Returns [`StoreError::Closed`] once the store has been closed.
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LocaleStore for FileLocaleStore {
    async fn save(&self, user: UserId, locale: LocaleCode) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut document = self.inner.document.lock().await;
        document.insert(user.to_string(), locale.as_str().to_owned());
        self.inner.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, user: UserId) -> Result<Option<LocaleCode>, StoreError> {
        self.ensure_open()?;
        let document = self.inner.document.lock().await;
        document
            .get(&user.to_string())
            .map(|code| LocaleCode::new(code).map_err(|err| StoreError::Invalid(err.to_string())))
            .transpose()
    }

    async fn exists(&self, user: UserId) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let document = self.inner.document.lock().await;
        Ok(document.contains_key(&user.to_string()))
    }

    async fn remove(&self, user: UserId) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut document = self.inner.document.lock().await;
        if document.remove(&user.to_string()).is_some() {
            self.inner.dirty.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(flusher) = self.flusher.lock().unwrap_or_else(PoisonError::into_inner).take()
        {
            flusher.abort();
        }
        if self.inner.dirty.load(Ordering::SeqCst) {
            self.inner.flush().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileLocaleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLocaleStore")
            .field("path", &self.inner.path)
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
