//! Storage backends for the settings document.
//!
//! The store actor does not know where the document lives. It holds
//! something implementing [`Storage`]: a JSON file in production, memory
//! in tests, anything else an embedder wants (a database row, a remote
//! config service) without touching the store.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use autorec_model::{Codec, JsonCodec};
use tokio::sync::Mutex;

use crate::{SettingsDocument, SettingsError};

/// Loads and saves the whole settings document.
///
/// Only the store actor calls these, one at a time, so implementations
/// need no locking of their own against concurrent saves.
pub trait Storage: Send + Sync + 'static {
    /// Reads the document. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> impl Future<Output = Result<Option<SettingsDocument>, SettingsError>> + Send;

    /// Replaces the stored document.
    fn save(
        &self,
        document: &SettingsDocument,
    ) -> impl Future<Output = Result<(), SettingsError>> + Send;
}

// ---------------------------------------------------------------------------
// JsonFileStorage
// ---------------------------------------------------------------------------

/// Stores the document as a file, JSON by default.
///
/// Saves go to a `.tmp` sibling first and are renamed over the target, so
/// a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage<C: Codec = JsonCodec> {
    path: PathBuf,
    codec: C,
}

impl JsonFileStorage {
    /// JSON storage at `path`. Parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, JsonCodec)
    }
}

impl<C: Codec> JsonFileStorage<C> {
    /// Storage at `path` using a custom codec.
    pub fn with_codec(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl<C: Codec> Storage for JsonFileStorage<C> {
    async fn load(&self) -> Result<Option<SettingsDocument>, SettingsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let document = self.codec.decode(&bytes)?;
        Ok(Some(document))
    }

    async fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError> {
        let bytes = self.codec.encode(document)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "settings written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-memory storage. Clones share the same document.
///
/// Counts saves and can be told to fail, which is what the store tests
/// need to observe batching and retry behavior.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    document: Mutex<Option<SettingsDocument>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `document`.
    pub fn with_document(document: SettingsDocument) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                document: Mutex::new(Some(document)),
                ..MemoryInner::default()
            }),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// The last saved document.
    pub async fn document(&self) -> Option<SettingsDocument> {
        self.inner.document.lock().await.clone()
    }
}

impl Storage for MemoryStorage {
    async fn load(&self) -> Result<Option<SettingsDocument>, SettingsError> {
        Ok(self.inner.document.lock().await.clone())
    }

    async fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SettingsError::Io(std::io::Error::other("storage unavailable")));
        }
        *self.inner.document.lock().await = Some(document.clone());
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
