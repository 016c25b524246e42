//! Room manager: creates, tracks, and removes watched rooms.

use std::collections::HashMap;
use std::sync::Arc;

use autorec_model::{RoomId, RoomInfo, RoomSettings};
use autorec_settings::SettingsSink;
use tokio::sync::broadcast;

use crate::room::DEFAULT_EVENT_CAPACITY;
use crate::{Backend, Room, RoomConfig, RoomError, RoomEvent};

/// The room list.
///
/// Owns every [`Room`], keeps them in insertion order, and funnels their
/// events into one broadcast channel.
pub struct RoomManager<B: Backend> {
    /// Active rooms, keyed by room ID.
    rooms: HashMap<RoomId, Room<B>>,
    /// Insertion order, which is also the order rooms are persisted in.
    order: Vec<RoomId>,
    backend: Arc<B>,
    settings: Arc<dyn SettingsSink>,
    events: broadcast::Sender<RoomEvent>,
}

impl<B: Backend> RoomManager<B> {
    pub fn new(backend: Arc<B>, settings: Arc<dyn SettingsSink>) -> Self {
        Self::with_capacity(backend, settings, DEFAULT_EVENT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may lag behind.
    pub fn with_capacity(
        backend: Arc<B>,
        settings: Arc<dyn SettingsSink>,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            backend,
            settings,
            events,
        }
    }

    /// Adds a room from a freshly fetched descriptor and persists it.
    pub fn add_room(&mut self, info: RoomInfo) -> Result<Room<B>, RoomError> {
        let config = RoomConfig::from_info(info);
        let room = self.insert(config)?;
        self.settings.mark_dirty(&room.settings());
        Ok(room)
    }

    /// Re-creates a room from persisted settings. Nothing is written.
    pub fn restore(&mut self, settings: RoomSettings) -> Result<Room<B>, RoomError> {
        self.insert(RoomConfig::from_settings(settings))
    }

    fn insert(&mut self, config: RoomConfig) -> Result<Room<B>, RoomError> {
        config.settings.validate()?;
        let room_id = config.room_id();
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists(room_id));
        }

        let room = Room::with_events(
            config,
            Arc::clone(&self.backend),
            Arc::clone(&self.settings),
            self.events.clone(),
        )?;
        self.rooms.insert(room_id, room.clone());
        self.order.push(room_id);
        tracing::info!(%room_id, rooms = self.order.len(), "room added");
        Ok(room)
    }

    /// Disposes a room and drops it from the settings.
    pub fn remove_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let room = self
            .rooms
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        self.order.retain(|id| *id != room_id);

        room.dispose();
        self.settings.forget(room_id);
        tracing::info!(%room_id, rooms = self.order.len(), "room removed");
        Ok(())
    }

    pub fn get(&self, room_id: RoomId) -> Option<Room<B>> {
        self.rooms.get(&room_id).cloned()
    }

    /// Room IDs in insertion order.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.order.clone()
    }

    /// Rooms in insertion order.
    pub fn rooms(&self) -> Vec<Room<B>> {
        self.order
            .iter()
            .filter_map(|id| self.rooms.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Events from every room in this manager.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    /// Disposes every room. Their settings stay persisted.
    pub fn shutdown(&mut self) {
        for room_id in self.order.drain(..) {
            if let Some(room) = self.rooms.remove(&room_id) {
                room.dispose();
            }
        }
        tracing::info!("all rooms disposed");
    }
}
