//! Events flowing out of a room, and the sinks collaborators report into.

use std::fmt;
use std::sync::{Arc, Weak};

use autorec_model::{RecordedSegment, RoomId, RoomInfo};

use crate::RecordingStatus;

/// Something a room wants the outside world to know about.
///
/// Rooms publish these on a broadcast channel; see
/// [`Room::subscribe`](crate::Room::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A human-readable log line.
    Log { room_id: RoomId, message: String },
    /// The room went live and notifications are enabled.
    Notify {
        room_id: RoomId,
        title: String,
        user_name: String,
    },
    TitleChanged { room_id: RoomId, title: String },
    /// The recorder finished writing a segment.
    RecordCompleted {
        room_id: RoomId,
        segment: RecordedSegment,
    },
    RecordingStatusChanged {
        room_id: RoomId,
        status: RecordingStatus,
    },
}

impl RoomEvent {
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Log { room_id, .. }
            | Self::Notify { room_id, .. }
            | Self::TitleChanged { room_id, .. }
            | Self::RecordCompleted { room_id, .. }
            | Self::RecordingStatusChanged { room_id, .. } => *room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Listener traits (implemented by the room)
// ---------------------------------------------------------------------------

/// Receives monitor reports. `generation` identifies the monitor instance
/// that sent them.
pub(crate) trait MonitorListener: Send + Sync {
    fn on_room_info(self: Arc<Self>, generation: u64, info: RoomInfo);
    fn on_stream_status(self: Arc<Self>, generation: u64, is_live: bool);
    fn on_monitor_log(self: Arc<Self>, generation: u64, message: String);
}

pub(crate) trait RecorderListener: Send + Sync {
    fn on_recorder_log(self: Arc<Self>, generation: u64, message: String);
    fn on_record_completed(self: Arc<Self>, generation: u64, segment: RecordedSegment);
    fn on_recorder_finished(self: Arc<Self>, generation: u64);
}

/// Stands in for a listener that never existed.
struct Detached;

impl MonitorListener for Detached {
    fn on_room_info(self: Arc<Self>, _: u64, _: RoomInfo) {}
    fn on_stream_status(self: Arc<Self>, _: u64, _: bool) {}
    fn on_monitor_log(self: Arc<Self>, _: u64, _: String) {}
}

impl RecorderListener for Detached {
    fn on_recorder_log(self: Arc<Self>, _: u64, _: String) {}
    fn on_record_completed(self: Arc<Self>, _: u64, _: RecordedSegment) {}
    fn on_recorder_finished(self: Arc<Self>, _: u64) {}
}

// ---------------------------------------------------------------------------
// MonitorEvents
// ---------------------------------------------------------------------------

/// The channel a monitor reports through.
///
/// Holds only a weak reference to its room, so a monitor that outlives
/// its room (or was replaced by a newer instance) reports into the void
/// instead of keeping the room alive or corrupting its state.
#[derive(Clone)]
pub struct MonitorEvents {
    listener: Weak<dyn MonitorListener>,
    generation: u64,
}

impl MonitorEvents {
    pub(crate) fn new(listener: Weak<dyn MonitorListener>, generation: u64) -> Self {
        Self {
            listener,
            generation,
        }
    }

    /// A sink connected to nothing. Useful for driving a monitor in
    /// isolation.
    pub fn detached() -> Self {
        let listener: Weak<dyn MonitorListener> = Weak::<Detached>::new();
        Self::new(listener, 0)
    }

    /// The platform returned a fresh descriptor for the room.
    pub fn room_info_updated(&self, info: RoomInfo) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_room_info(self.generation, info);
        }
    }

    /// The room's live flag as last observed.
    pub fn stream_status_changed(&self, is_live: bool) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_stream_status(self.generation, is_live);
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_monitor_log(self.generation, message.into());
        }
    }

    /// `true` once the room this sink reports into is gone.
    pub fn is_detached(&self) -> bool {
        self.listener.strong_count() == 0
    }
}

impl fmt::Debug for MonitorEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorEvents")
            .field("generation", &self.generation)
            .field("detached", &self.is_detached())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RecorderEvents
// ---------------------------------------------------------------------------

/// The channel a recorder reports through. Same lifetime rules as
/// [`MonitorEvents`].
#[derive(Clone)]
pub struct RecorderEvents {
    listener: Weak<dyn RecorderListener>,
    generation: u64,
}

impl RecorderEvents {
    pub(crate) fn new(listener: Weak<dyn RecorderListener>, generation: u64) -> Self {
        Self {
            listener,
            generation,
        }
    }

    pub fn detached() -> Self {
        let listener: Weak<dyn RecorderListener> = Weak::<Detached>::new();
        Self::new(listener, 0)
    }

    pub fn log(&self, message: impl Into<String>) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_recorder_log(self.generation, message.into());
        }
    }

    /// A segment was closed and is complete on disk.
    pub fn record_completed(&self, segment: RecordedSegment) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_record_completed(self.generation, segment);
        }
    }

    /// The recording ended on its own (stream closed, fatal write error).
    /// The room disposes the recorder and goes back to `Stopped`.
    pub fn finished(&self) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_recorder_finished(self.generation);
        }
    }

    pub fn is_detached(&self) -> bool {
        self.listener.strong_count() == 0
    }
}

impl fmt::Debug for RecorderEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderEvents")
            .field("generation", &self.generation)
            .field("detached", &self.is_detached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(u64, bool)>>,
    }

    impl MonitorListener for Recording {
        fn on_room_info(self: Arc<Self>, _: u64, _: RoomInfo) {}
        fn on_stream_status(self: Arc<Self>, generation: u64, is_live: bool) {
            self.seen.lock().unwrap().push((generation, is_live));
        }
        fn on_monitor_log(self: Arc<Self>, _: u64, _: String) {}
    }

    #[test]
    fn test_events_carry_generation() {
        let listener = Arc::new(Recording::default());
        let weak: Weak<dyn MonitorListener> = Arc::downgrade(&listener) as Weak<dyn MonitorListener>;
        let events = MonitorEvents::new(weak, 4);

        events.stream_status_changed(true);

        assert_eq!(*listener.seen.lock().unwrap(), vec![(4, true)]);
        assert!(!events.is_detached());
    }

    #[test]
    fn test_events_after_listener_dropped_are_ignored() {
        let listener = Arc::new(Recording::default());
        let weak: Weak<dyn MonitorListener> = Arc::downgrade(&listener) as Weak<dyn MonitorListener>;
        let events = MonitorEvents::new(weak, 1);
        drop(listener);

        events.stream_status_changed(true);

        assert!(events.is_detached());
    }

    #[test]
    fn test_detached_sinks_do_nothing() {
        let monitor = MonitorEvents::detached();
        let recorder = RecorderEvents::detached();

        monitor.log("hello");
        recorder.finished();

        assert!(monitor.is_detached());
        assert!(recorder.is_detached());
    }

    #[test]
    fn test_room_event_room_id() {
        let event = RoomEvent::TitleChanged {
            room_id: RoomId(9),
            title: "t".into(),
        };
        assert_eq!(event.room_id(), RoomId(9));
    }
}
