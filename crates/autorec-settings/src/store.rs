//! The settings store actor and its handle.
//!
//! The store runs as one Tokio task that owns the settings document.
//! Rooms never touch the document directly; they send commands through a
//! [`SettingsHandle`]. Because a single task performs every save, saves
//! from different rooms are serialized by construction.
//!
//! # Batching
//!
//! ```text
//! mark_dirty ──→ [dirty, flush due in `debounce`] ──→ more changes (coalesced)
//!                                │
//!                                ▼ deadline
//!                           save whole document ──→ [clean]
//!                                │ error
//!                                ▼
//!                    warn, stay dirty; next change or flush() retries
//! ```

use std::collections::HashSet;

use autorec_model::{RoomId, RoomSettings};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::{SettingsConfig, SettingsDocument, SettingsError, SettingsSink, Storage};

/// Commands sent to the store actor.
enum StoreCommand {
    Upsert(RoomSettings),
    Forget(RoomId),
    Flush(oneshot::Sender<Result<(), SettingsError>>),
    Snapshot(oneshot::Sender<SettingsDocument>),
    Shutdown(oneshot::Sender<Result<(), SettingsError>>),
}

// ---------------------------------------------------------------------------
// SettingsHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to the store actor.
///
/// Implements [`SettingsSink`], so it can be handed straight to rooms.
#[derive(Clone)]
pub struct SettingsHandle {
    sender: mpsc::UnboundedSender<StoreCommand>,
}

impl SettingsHandle {
    /// Writes any pending change now, bypassing the debounce.
    pub async fn flush(&self) -> Result<(), SettingsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Flush(reply_tx))
            .map_err(|_| SettingsError::Closed)?;
        reply_rx.await.map_err(|_| SettingsError::Closed)?
    }

    /// A copy of the current (possibly unsaved) document.
    pub async fn snapshot(&self) -> Result<SettingsDocument, SettingsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Snapshot(reply_tx))
            .map_err(|_| SettingsError::Closed)?;
        reply_rx.await.map_err(|_| SettingsError::Closed)
    }

    /// Performs a final flush and stops the actor.
    ///
    /// Every later call on any clone of this handle returns
    /// [`SettingsError::Closed`]; `mark_dirty` only logs.
    pub async fn shutdown(&self) -> Result<(), SettingsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Shutdown(reply_tx))
            .map_err(|_| SettingsError::Closed)?;
        reply_rx.await.map_err(|_| SettingsError::Closed)?
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl SettingsSink for SettingsHandle {
    fn mark_dirty(&self, settings: &RoomSettings) {
        if self
            .sender
            .send(StoreCommand::Upsert(settings.clone()))
            .is_err()
        {
            tracing::warn!(
                room_id = %settings.room_id,
                "settings store closed, change not persisted"
            );
        }
    }

    fn forget(&self, room_id: RoomId) {
        if self.sender.send(StoreCommand::Forget(room_id)).is_err() {
            tracing::warn!(%room_id, "settings store closed, removal not persisted");
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// The store actor state. Runs inside a Tokio task.
pub struct SettingsStore<S: Storage> {
    storage: S,
    config: SettingsConfig,
    document: SettingsDocument,
    dirty: bool,
    /// When the pending change must be written. `None` while clean, or
    /// after a failed save until the next change or flush.
    flush_at: Option<Instant>,
    receiver: mpsc::UnboundedReceiver<StoreCommand>,
}

impl<S: Storage> SettingsStore<S> {
    /// Loads the document from `storage`, spawns the store actor, and
    /// returns a handle plus the rooms to restore.
    ///
    /// Entries that fail validation, or repeat an earlier room id, are
    /// skipped with a warning; they disappear from the file on the next
    /// save.
    ///
    /// # Errors
    /// Fails if the storage cannot be read or the document cannot be
    /// decoded. A missing document is not an error.
    pub async fn open(
        storage: S,
        config: SettingsConfig,
    ) -> Result<(SettingsHandle, Vec<RoomSettings>), SettingsError> {
        let loaded = storage.load().await?.unwrap_or_default();
        let document = sanitize(loaded);
        let rooms = document.rooms.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            storage,
            config,
            document,
            dirty: false,
            flush_at: None,
            receiver: rx,
        };
        tokio::spawn(store.run());

        tracing::info!(rooms = rooms.len(), "settings store opened");
        Ok((SettingsHandle { sender: tx }, rooms))
    }

    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        loop {
            let deadline = self.flush_at;
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(StoreCommand::Upsert(settings)) => {
                        if self.document.upsert(settings) {
                            self.mark_dirty();
                        }
                    }
                    Some(StoreCommand::Forget(room_id)) => {
                        if self.document.remove(room_id) {
                            self.mark_dirty();
                        }
                    }
                    Some(StoreCommand::Flush(reply)) => {
                        let result = self.flush().await;
                        let _ = reply.send(result);
                    }
                    Some(StoreCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.document.clone());
                    }
                    Some(StoreCommand::Shutdown(reply)) => {
                        let result = self.flush().await;
                        let _ = reply.send(result);
                        break;
                    }
                    None => {
                        let _ = self.flush().await;
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    let _ = self.flush().await;
                }
            }
        }

        tracing::info!("settings store stopped");
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.flush_at.is_none() {
            self.flush_at = Some(Instant::now() + self.config.debounce);
        }
    }

    /// Saves the whole document if anything changed since the last save.
    async fn flush(&mut self) -> Result<(), SettingsError> {
        self.flush_at = None;
        if !self.dirty {
            return Ok(());
        }
        match self.storage.save(&self.document).await {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(rooms = self.document.len(), "settings saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "settings save failed, will retry");
                Err(e)
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn sanitize(document: SettingsDocument) -> SettingsDocument {
    let mut seen = HashSet::new();
    let rooms = document
        .rooms
        .into_iter()
        .filter(|room| {
            if let Err(e) = room.validate() {
                tracing::warn!(room_id = %room.room_id, error = %e, "skipping invalid room settings");
                return false;
            }
            if !seen.insert(room.room_id) {
                tracing::warn!(room_id = %room.room_id, "skipping duplicate room settings");
                return false;
            }
            true
        })
        .collect();
    SettingsDocument { rooms }
}
