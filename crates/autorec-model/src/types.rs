//! Identity types and collaborator payloads.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The canonical numeric id of a broadcast room.
///
/// Newtype over `u64` so it cannot be mixed up with a [`ShortRoomId`].
/// Serialized as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

/// Displays as the bare number, matching how the platform prints ids.
impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The vanity short id some rooms carry. `0` means the room has none.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShortRoomId(pub u64);

impl ShortRoomId {
    /// Returns `true` if the room has a short id.
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ShortRoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomInfo
// ---------------------------------------------------------------------------

/// Room descriptor as fetched from the platform.
///
/// Used both to bootstrap a new room and as the payload of the monitor's
/// room-info-updated event. Live status is deliberately not part of it:
/// that travels through the stream-status-changed event only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub short_room_id: ShortRoomId,
    pub title: String,
    pub user_name: String,
}

impl RoomInfo {
    /// Creates a descriptor with just an id; the rest stays empty.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// RecordedSegment
// ---------------------------------------------------------------------------

/// A finished file written by a recorder.
///
/// Emitted through the record-completed event. The recorder guarantees
/// every completed segment is reported before it is disposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSegment {
    /// Where the segment was written.
    pub path: PathBuf,
    /// Wall-clock length of the capture.
    pub duration: Duration,
    /// Size on disk.
    pub size_bytes: u64,
}

impl fmt::Display for RecordedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}s, {} bytes)",
            self.path.display(),
            self.duration.as_secs(),
            self.size_bytes
        )
    }
}
