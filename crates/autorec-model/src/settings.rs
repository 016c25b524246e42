//! Persisted per-room settings and the timing views derived from them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ModelError, RoomId};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const DEFAULT_DANMAKU_RETRY_MS: u32 = 2_000;
const DEFAULT_CHECK_INTERVAL_SEC: u32 = 300;
const DEFAULT_STREAM_RETRY_MS: u32 = 6_000;
const DEFAULT_STREAM_CONNECT_TIMEOUT_MS: u32 = 3_000;

fn default_danmaku_retry_ms() -> u32 {
    DEFAULT_DANMAKU_RETRY_MS
}

fn default_check_interval_sec() -> u32 {
    DEFAULT_CHECK_INTERVAL_SEC
}

fn default_stream_retry_ms() -> u32 {
    DEFAULT_STREAM_RETRY_MS
}

fn default_stream_connect_timeout_ms() -> u32 {
    DEFAULT_STREAM_CONNECT_TIMEOUT_MS
}

fn enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// The persisted half of a room's configuration.
///
/// Exactly the fields that survive a restart: the room id, four timing
/// parameters and three feature toggles. Display fields (title, user
/// name, live flag, recording status, short id) are never stored.
///
/// Field names on disk match the settings file of the desktop tool that
/// used to manage these rooms, so an existing file loads unchanged. Every
/// field except `RoomId` falls back to its default when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(rename = "RoomId")]
    pub room_id: RoomId,

    /// Reconnect delay of the chat (danmaku) channel, milliseconds.
    #[serde(rename = "TimingDanmakuRetry", default = "default_danmaku_retry_ms")]
    pub danmaku_retry_ms: u32,

    /// Status poll interval, seconds.
    #[serde(rename = "TimingCheckInterval", default = "default_check_interval_sec")]
    pub check_interval_sec: u32,

    /// Delay before the recorder reconnects a dropped stream, milliseconds.
    #[serde(rename = "TimingStreamRetry", default = "default_stream_retry_ms")]
    pub stream_retry_ms: u32,

    /// Connect timeout for the stream server, milliseconds.
    #[serde(rename = "TimingStreamConnect", default = "default_stream_connect_timeout_ms")]
    pub stream_connect_timeout_ms: u32,

    /// Record automatically when the room goes live.
    #[serde(rename = "IsMonitor", default = "enabled")]
    pub is_monitor_enabled: bool,

    /// Raise a notification when the room goes live.
    #[serde(rename = "IsNotify", default = "enabled")]
    pub is_notify_enabled: bool,

    /// Keep the monitor running for title logging even when recording is off.
    #[serde(rename = "LogTitle", default = "enabled")]
    pub log_title_only: bool,
}

impl RoomSettings {
    /// Settings for `room_id` with every other field at its default.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            danmaku_retry_ms: DEFAULT_DANMAKU_RETRY_MS,
            check_interval_sec: DEFAULT_CHECK_INTERVAL_SEC,
            stream_retry_ms: DEFAULT_STREAM_RETRY_MS,
            stream_connect_timeout_ms: DEFAULT_STREAM_CONNECT_TIMEOUT_MS,
            is_monitor_enabled: true,
            is_notify_enabled: true,
            log_title_only: true,
        }
    }

    /// Rejects settings that cannot describe a real room.
    ///
    /// # Errors
    /// Returns [`ModelError::Invalid`] when `room_id` is 0.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.room_id.0 == 0 {
            return Err(ModelError::Invalid("room id must be non-zero".into()));
        }
        Ok(())
    }

    /// Whether the room needs a monitor instance at all.
    pub fn wants_monitor(&self) -> bool {
        self.is_monitor_enabled || self.log_title_only
    }

    /// Timing view for the monitor collaborator.
    pub fn monitor_timing(&self) -> MonitorTiming {
        MonitorTiming {
            danmaku_retry: Duration::from_millis(u64::from(self.danmaku_retry_ms)),
            check_interval: Duration::from_secs(u64::from(self.check_interval_sec)),
        }
    }

    /// Timing view for the recorder collaborator.
    pub fn recorder_timing(&self) -> RecorderTiming {
        RecorderTiming {
            stream_retry: Duration::from_millis(u64::from(self.stream_retry_ms)),
            stream_connect_timeout: Duration::from_millis(u64::from(
                self.stream_connect_timeout_ms,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Timing views
// ---------------------------------------------------------------------------

/// What a monitor needs to know about timing. Hot-reloadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    /// Delay before retrying after a failed fetch or a dropped chat channel.
    pub danmaku_retry: Duration,
    /// Regular status poll interval.
    pub check_interval: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        RoomSettings::new(RoomId::default()).monitor_timing()
    }
}

/// What a recorder needs to know about timing. Read once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderTiming {
    pub stream_retry: Duration,
    pub stream_connect_timeout: Duration,
}

impl Default for RecorderTiming {
    fn default() -> Self {
        RoomSettings::new(RoomId::default()).recorder_timing()
    }
}
