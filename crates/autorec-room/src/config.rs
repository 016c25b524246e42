//! Room configuration and the recording state machine.

use std::fmt;

use autorec_model::{RoomId, RoomInfo, RoomSettings, ShortRoomId};

// ---------------------------------------------------------------------------
// RecordingStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a room's recorder.
///
/// ```text
///            start guard passes        recorder start() Ok
/// Stopped ───────────────────→ Starting ───────────────────→ Recording
///    ↑                          │    │                            │
///    │     start failed/raced   │    │ stop during start          │ stop, or recorder finished
///    ├──────────────────────────┘    └──────────→ Stopping ←──────┘
///    │                                               │
///    └──────────────── recorder disposed ────────────┘
/// ```
///
/// - **Stopped**: no recorder exists. Initial and terminal.
/// - **Starting**: a recorder was constructed and its start is in flight.
///   A second start request in this state is ignored.
/// - **Recording**: the recorder confirmed that capture began.
/// - **Stopping**: the recorder is being disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingStatus {
    #[default]
    Stopped,
    Starting,
    Recording,
    Stopping,
}

impl RecordingStatus {
    /// `true` in every state where a recorder instance may exist.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Returns `true` if moving to `target` is a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Recording)
                | (Self::Starting, Self::Stopping)
                | (Self::Starting, Self::Stopped)
                | (Self::Recording, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Starting => write!(f, "Starting"),
            Self::Recording => write!(f, "Recording"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Everything a room knows about itself.
///
/// `settings` is the persisted half. The rest is derived from the
/// platform or from the recorder and starts at defaults on every launch.
///
/// A [`Room`](crate::Room) owns its `RoomConfig` exclusively and hands
/// out clones; changes go through the room's setters so the dispatch
/// table sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub settings: RoomSettings,
    pub short_room_id: ShortRoomId,
    pub title: String,
    pub user_name: String,
    pub is_live: bool,
    pub recording_status: RecordingStatus,
}

impl RoomConfig {
    /// Bootstraps a room from a freshly fetched descriptor. Persisted
    /// fields take their defaults.
    pub fn from_info(info: RoomInfo) -> Self {
        Self {
            settings: RoomSettings::new(info.room_id),
            short_room_id: info.short_room_id,
            title: info.title,
            user_name: info.user_name,
            is_live: false,
            recording_status: RecordingStatus::Stopped,
        }
    }

    /// Bootstraps a room from persisted settings. Derived fields take
    /// their defaults until the monitor reports.
    pub fn from_settings(settings: RoomSettings) -> Self {
        Self {
            settings,
            short_room_id: ShortRoomId::default(),
            title: String::new(),
            user_name: String::new(),
            is_live: false,
            recording_status: RecordingStatus::Stopped,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.settings.room_id
    }

    /// Whether a recorder should be running right now.
    pub fn wants_recording(&self) -> bool {
        self.is_live && self.settings.is_monitor_enabled
    }
}
