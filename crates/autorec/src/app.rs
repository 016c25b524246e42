//! `Autorec` builder and application handle.
//!
//! Ties the layers together: settings store → room manager → rooms, plus
//! a relay task that forwards room events to the log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use autorec_model::{RoomId, RoomInfo};
use autorec_room::{Backend, Room, RoomEvent, RoomManager};
use autorec_settings::{
    JsonFileStorage, SettingsConfig, SettingsHandle, SettingsSink, SettingsStore, Storage,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::AutorecError;

/// Settings file used when none is configured.
pub const DEFAULT_SETTINGS_PATH: &str = "autorec.json";

/// Default capacity of the shared room event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Builder for configuring and starting autorec.
///
/// # Example
///
/// ```rust,ignore
/// use autorec::prelude::*;
///
/// let app = Autorec::builder()
///     .settings_path("/var/lib/autorec/settings.json")
///     .build(MyBackend::new())
///     .await?;
/// app.run().await
/// ```
pub struct AutorecBuilder {
    settings_path: PathBuf,
    debounce: Duration,
    event_capacity: usize,
}

impl AutorecBuilder {
    pub fn new() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            debounce: SettingsConfig::default().debounce,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Where the settings document lives.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    /// How long setting changes are batched before a save.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// How far an event subscriber may lag before it misses events.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Opens the settings file, restores every persisted room, and starts
    /// the event relay.
    pub async fn build<B: Backend>(self, backend: B) -> Result<Autorec<B>, AutorecError> {
        let storage = JsonFileStorage::new(self.settings_path.clone());
        self.build_with_storage(backend, storage).await
    }

    /// Like [`build`](Self::build) with a custom settings backend.
    pub async fn build_with_storage<B: Backend, S: Storage>(
        self,
        backend: B,
        storage: S,
    ) -> Result<Autorec<B>, AutorecError> {
        let config = SettingsConfig {
            debounce: self.debounce,
        };
        let (settings, restored) = SettingsStore::open(storage, config).await?;

        let sink: Arc<dyn SettingsSink> = Arc::new(settings.clone());
        let mut rooms = RoomManager::with_capacity(Arc::new(backend), sink, self.event_capacity);
        let relay = tokio::spawn(relay_events(rooms.subscribe()));

        for room in restored {
            let room_id = room.room_id;
            if let Err(e) = rooms.restore(room) {
                tracing::warn!(%room_id, error = %e, "room not restored");
            }
        }

        tracing::info!(rooms = rooms.len(), "autorec ready");
        Ok(Autorec {
            rooms,
            settings,
            relay,
        })
    }
}

impl Default for AutorecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running autorec instance.
pub struct Autorec<B: Backend> {
    rooms: RoomManager<B>,
    settings: SettingsHandle,
    relay: JoinHandle<()>,
}

impl<B: Backend> Autorec<B> {
    pub fn builder() -> AutorecBuilder {
        AutorecBuilder::new()
    }

    /// Starts watching a new room and persists it.
    pub fn add_room(&mut self, info: RoomInfo) -> Result<Room<B>, AutorecError> {
        Ok(self.rooms.add_room(info)?)
    }

    /// Stops watching a room and drops it from the settings.
    pub fn remove_room(&mut self, room_id: RoomId) -> Result<(), AutorecError> {
        Ok(self.rooms.remove_room(room_id)?)
    }

    pub fn room(&self, room_id: RoomId) -> Option<Room<B>> {
        self.rooms.get(room_id)
    }

    /// Every room, in the order they were added.
    pub fn rooms(&self) -> Vec<Room<B>> {
        self.rooms.rooms()
    }

    /// Events from every room.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.rooms.subscribe()
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Disposes every room and writes pending settings.
    pub async fn shutdown(mut self) -> Result<(), AutorecError> {
        self.rooms.shutdown();
        let flushed = self.settings.shutdown().await;
        self.relay.abort();
        tracing::info!("autorec stopped");
        Ok(flushed?)
    }

    /// Runs until Ctrl-C, then shuts down.
    pub async fn run(self) -> Result<(), AutorecError> {
        tracing::info!(rooms = self.rooms.len(), "autorec running, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown requested");
        self.shutdown().await
    }
}

/// Forwards room events to the log until the channel closes.
async fn relay_events(mut events: broadcast::Receiver<RoomEvent>) {
    loop {
        match events.recv().await {
            Ok(RoomEvent::Log { room_id, message }) => {
                tracing::info!(%room_id, "{message}");
            }
            Ok(RoomEvent::Notify {
                room_id,
                title,
                user_name,
            }) => {
                tracing::info!(%room_id, %user_name, %title, "room went live");
            }
            Ok(RoomEvent::RecordCompleted { room_id, segment }) => {
                tracing::info!(%room_id, %segment, "recording saved");
            }
            Ok(RoomEvent::TitleChanged { room_id, title }) => {
                tracing::debug!(%room_id, %title, "title changed");
            }
            Ok(RoomEvent::RecordingStatusChanged { room_id, status }) => {
                tracing::debug!(%room_id, %status, "recording status");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event relay lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
