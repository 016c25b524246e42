//! The reactive dispatch table.
//!
//! Every tracked field mutation on a [`Room`](crate::Room) is described
//! as a [`FieldChange`] and handed to [`plan`], which decides what
//! happens next. `plan` is pure: it only reads the room's configuration
//! as it stands right after the change, and returns the [`Command`]s to
//! execute, in order. The room then executes them on the calling thread.

use autorec_model::{MonitorTiming, RoomId, ShortRoomId};

use crate::{RoomConfig, RoomEvent};

/// Identifies a tracked field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Live,
    Title,
    UserName,
    ShortRoomId,
    DanmakuRetry,
    CheckInterval,
    StreamRetry,
    StreamConnectTimeout,
    MonitorEnabled,
    NotifyEnabled,
    LogTitleOnly,
}

impl Field {
    /// `true` for fields stored in the settings file.
    pub fn is_persisted(self) -> bool {
        matches!(
            self,
            Self::DanmakuRetry
                | Self::CheckInterval
                | Self::StreamRetry
                | Self::StreamConnectTimeout
                | Self::MonitorEnabled
                | Self::NotifyEnabled
                | Self::LogTitleOnly
        )
    }
}

/// A field that changed, with its old and new value.
///
/// Only real changes are described: setting a field to the value it
/// already holds never produces a `FieldChange`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Live { old: bool, new: bool },
    Title { old: String, new: String },
    UserName { old: String, new: String },
    ShortRoomId { old: ShortRoomId, new: ShortRoomId },
    DanmakuRetryMs { old: u32, new: u32 },
    CheckIntervalSec { old: u32, new: u32 },
    StreamRetryMs { old: u32, new: u32 },
    StreamConnectTimeoutMs { old: u32, new: u32 },
    MonitorEnabled { old: bool, new: bool },
    NotifyEnabled { old: bool, new: bool },
    LogTitleOnly { old: bool, new: bool },
}

impl FieldChange {
    pub fn field(&self) -> Field {
        match self {
            Self::Live { .. } => Field::Live,
            Self::Title { .. } => Field::Title,
            Self::UserName { .. } => Field::UserName,
            Self::ShortRoomId { .. } => Field::ShortRoomId,
            Self::DanmakuRetryMs { .. } => Field::DanmakuRetry,
            Self::CheckIntervalSec { .. } => Field::CheckInterval,
            Self::StreamRetryMs { .. } => Field::StreamRetry,
            Self::StreamConnectTimeoutMs { .. } => Field::StreamConnectTimeout,
            Self::MonitorEnabled { .. } => Field::MonitorEnabled,
            Self::NotifyEnabled { .. } => Field::NotifyEnabled,
            Self::LogTitleOnly { .. } => Field::LogTitleOnly,
        }
    }
}

/// One step the room performs in reaction to a field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Publish an event to subscribers.
    Emit(RoomEvent),
    /// Spawn the guarded recorder start.
    StartRecorder,
    /// Dispose the recorder, if any.
    StopRecorder,
    /// Create the monitor if there is none, then start it.
    EnsureMonitorStarted,
    /// Pause the monitor without disposing it.
    PauseMonitor,
    /// Hot-reload the monitor's timing.
    ApplyMonitorTiming(MonitorTiming),
    /// Hand the room's settings to the settings store.
    Persist,
}

/// Maps a field change to the commands that follow from it.
///
/// `room` is the configuration after the change was applied.
///
/// Ordering: going live logs, then notifies, then starts the recorder;
/// going offline stops the recorder before logging.
pub fn plan(change: &FieldChange, room: &RoomConfig) -> Vec<Command> {
    let room_id = room.room_id();
    let settings = &room.settings;
    let mut commands = Vec::new();

    match change {
        FieldChange::Live { new: true, .. } => {
            commands.push(Command::Emit(RoomEvent::Log {
                room_id,
                message: went_live_line(room_id, room),
            }));
            if settings.is_notify_enabled {
                commands.push(Command::Emit(RoomEvent::Notify {
                    room_id,
                    title: room.title.clone(),
                    user_name: room.user_name.clone(),
                }));
            }
            if settings.is_monitor_enabled {
                commands.push(Command::StartRecorder);
            }
        }
        FieldChange::Live { new: false, .. } => {
            commands.push(Command::StopRecorder);
            commands.push(Command::Emit(RoomEvent::Log {
                room_id,
                message: offline_line(room_id, room),
            }));
        }
        FieldChange::Title { new, .. } => {
            commands.push(Command::Emit(RoomEvent::TitleChanged {
                room_id,
                title: new.clone(),
            }));
        }
        FieldChange::MonitorEnabled { new: true, .. } => {
            commands.push(Command::EnsureMonitorStarted);
            if room.is_live {
                commands.push(Command::StartRecorder);
            }
        }
        FieldChange::MonitorEnabled { new: false, .. } => {
            if !settings.log_title_only {
                commands.push(Command::PauseMonitor);
            }
            commands.push(Command::StopRecorder);
        }
        FieldChange::LogTitleOnly { new, .. } if !settings.is_monitor_enabled => {
            commands.push(if *new {
                Command::EnsureMonitorStarted
            } else {
                Command::PauseMonitor
            });
        }
        FieldChange::DanmakuRetryMs { .. } | FieldChange::CheckIntervalSec { .. } => {
            commands.push(Command::ApplyMonitorTiming(settings.monitor_timing()));
        }
        _ => {}
    }

    if change.field().is_persisted() {
        commands.push(Command::Persist);
    }
    commands
}

fn went_live_line(room_id: RoomId, room: &RoomConfig) -> String {
    format!("[{room_id}] [{}] went live: {}", room.user_name, room.title)
}

fn offline_line(room_id: RoomId, room: &RoomConfig) -> String {
    format!("[{room_id}] [{}] is offline", room.user_name)
}

/// Writes `value` into `slot` and describes the change, if there was one.
pub(crate) fn replace<T: PartialEq + Clone>(slot: &mut T, value: T) -> Option<(T, T)> {
    if *slot == value {
        return None;
    }
    let old = std::mem::replace(slot, value.clone());
    Some((old, value))
}
