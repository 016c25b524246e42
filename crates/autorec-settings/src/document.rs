//! The settings document and store configuration.

use std::time::Duration;

use autorec_model::{RoomId, RoomSettings};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SettingsConfig
// ---------------------------------------------------------------------------

/// Configuration for the store actor.
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// How long to wait after the first unsaved change before writing.
    ///
    /// Toggling several settings in a row (or several rooms reacting to
    /// one UI action) produces a single save. Default: 500 ms.
    pub debounce: Duration,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsDocument
// ---------------------------------------------------------------------------

/// Everything that is persisted, saved and loaded as one unit.
///
/// Rooms keep their insertion order so the room list comes back the way
/// the user arranged it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(rename = "Rooms", default)]
    pub rooms: Vec<RoomSettings>,
}

impl SettingsDocument {
    /// Looks up a room's settings.
    pub fn get(&self, room_id: RoomId) -> Option<&RoomSettings> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }

    /// Inserts or replaces a room's settings.
    ///
    /// Returns `true` if the document changed.
    pub fn upsert(&mut self, settings: RoomSettings) -> bool {
        match self.rooms.iter_mut().find(|r| r.room_id == settings.room_id) {
            Some(existing) if *existing == settings => false,
            Some(existing) => {
                *existing = settings;
                true
            }
            None => {
                self.rooms.push(settings);
                true
            }
        }
    }

    /// Removes a room. Returns `true` if it was present.
    pub fn remove(&mut self, room_id: RoomId) -> bool {
        let before = self.rooms.len();
        self.rooms.retain(|r| r.room_id != room_id);
        self.rooms.len() != before
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
