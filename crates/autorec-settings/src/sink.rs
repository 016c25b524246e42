//! The interface rooms use to report persisted-setting changes.

use autorec_model::{RoomId, RoomSettings};

/// Receives "this room's persisted settings changed" notifications.
///
/// Both methods are synchronous and must not block: rooms call them from
/// their dispatch path, which runs on whatever thread mutated the room
/// (a UI thread, a monitor callback, a timer). [`SettingsHandle`] turns
/// them into messages for the store actor; tests implement the trait with
/// a counter.
///
/// [`SettingsHandle`]: crate::SettingsHandle
pub trait SettingsSink: Send + Sync + 'static {
    /// The room's persisted settings changed; the whole document is due
    /// for a save.
    fn mark_dirty(&self, settings: &RoomSettings);

    /// The room was removed from the room list.
    fn forget(&self, room_id: RoomId);
}
