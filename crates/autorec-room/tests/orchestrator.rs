//! Integration tests for the room orchestrator using mock collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use autorec_model::{MonitorTiming, RecordedSegment, RoomId, RoomInfo, RoomSettings, ShortRoomId};
use autorec_room::{
    Backend, HandleError, MonitorContext, MonitorEvents, MonitorHandle, PollingMonitor,
    RecorderContext, RecorderHandle, RecordingStatus, Room, RoomConfig, RoomError, RoomEvent,
    RoomManager, RoomStatus, StatusSource,
};
use autorec_settings::SettingsSink;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

// =========================================================================
// Mock monitor
// =========================================================================

struct MonitorSpy {
    events: MonitorEvents,
    timing: MonitorTiming,
    running: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
    reloads: Mutex<Vec<MonitorTiming>>,
    disposed: AtomicBool,
}

struct MockMonitor(Arc<MonitorSpy>);

impl MonitorHandle for MockMonitor {
    fn start(&self) -> Result<(), HandleError> {
        self.0.starts.fetch_add(1, Ordering::SeqCst);
        self.0.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), HandleError> {
        self.0.stops.fetch_add(1, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn apply_setting_change(&self, timing: MonitorTiming) -> Result<(), HandleError> {
        self.0.reloads.lock().push(timing);
        Ok(())
    }

    fn dispose(&self) -> Result<(), HandleError> {
        self.0.running.store(false, Ordering::SeqCst);
        self.0.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Mock recorder
// =========================================================================

/// Counts recorders that exist and have not been disposed.
#[derive(Default)]
struct Census {
    alive: AtomicUsize,
    max_alive: AtomicUsize,
}

struct RecorderSpy {
    ctx: RecorderContext,
    census: Arc<Census>,
    gated: bool,
    fail_start: bool,
    dispose_delay: Duration,
    flush_on_dispose: bool,
    release: Notify,
    disposed: AtomicBool,
}

impl RecorderSpy {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct MockRecorder(Arc<RecorderSpy>);

impl RecorderHandle for MockRecorder {
    async fn start(&self) -> Result<(), HandleError> {
        if self.0.gated {
            self.0.release.notified().await;
        }
        if self.0.is_disposed() {
            return Err(HandleError::Disposed);
        }
        if self.0.fail_start {
            return Err(HandleError::Connect("connection refused".into()));
        }
        Ok(())
    }

    fn dispose(&self) -> Result<(), HandleError> {
        if self.0.flush_on_dispose {
            self.0.ctx.events.record_completed(segment());
        }
        if !self.0.dispose_delay.is_zero() {
            std::thread::sleep(self.0.dispose_delay);
        }
        if !self.0.disposed.swap(true, Ordering::SeqCst) {
            self.0.census.alive.fetch_sub(1, Ordering::SeqCst);
        }
        // A start waiting on the gate must notice the dispose.
        self.0.release.notify_one();
        Ok(())
    }
}

// =========================================================================
// Mock backend
// =========================================================================

#[derive(Default)]
struct MockBackend {
    monitors: Mutex<Vec<Arc<MonitorSpy>>>,
    recorders: Mutex<Vec<Arc<RecorderSpy>>>,
    census: Arc<Census>,
    gated: AtomicBool,
    fail_start: AtomicBool,
    fail_create: AtomicBool,
    dispose_delay: Mutex<Duration>,
    flush_on_dispose: AtomicBool,
}

impl MockBackend {
    fn gated() -> Self {
        let backend = Self::default();
        backend.gated.store(true, Ordering::SeqCst);
        backend
    }

    fn monitor_count(&self) -> usize {
        self.monitors.lock().len()
    }

    fn last_monitor(&self) -> Arc<MonitorSpy> {
        Arc::clone(self.monitors.lock().last().expect("no monitor created"))
    }

    fn recorder_count(&self) -> usize {
        self.recorders.lock().len()
    }

    fn last_recorder(&self) -> Arc<RecorderSpy> {
        Arc::clone(self.recorders.lock().last().expect("no recorder created"))
    }

    fn release_all(&self) {
        for recorder in self.recorders.lock().iter() {
            recorder.release.notify_one();
        }
    }

    fn make_recorder(&self, ctx: RecorderContext) -> Result<MockRecorder, HandleError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(HandleError::Other("no stream url".into()));
        }
        let alive = self.census.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.census.max_alive.fetch_max(alive, Ordering::SeqCst);

        let spy = Arc::new(RecorderSpy {
            ctx,
            census: Arc::clone(&self.census),
            gated: self.gated.load(Ordering::SeqCst),
            fail_start: self.fail_start.load(Ordering::SeqCst),
            dispose_delay: *self.dispose_delay.lock(),
            flush_on_dispose: self.flush_on_dispose.load(Ordering::SeqCst),
            release: Notify::new(),
            disposed: AtomicBool::new(false),
        });
        self.recorders.lock().push(Arc::clone(&spy));
        Ok(MockRecorder(spy))
    }
}

impl Backend for MockBackend {
    type Monitor = MockMonitor;
    type Recorder = MockRecorder;

    fn create_monitor(&self, ctx: MonitorContext) -> Result<MockMonitor, HandleError> {
        let spy = Arc::new(MonitorSpy {
            events: ctx.events,
            timing: ctx.timing,
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            reloads: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });
        self.monitors.lock().push(Arc::clone(&spy));
        Ok(MockMonitor(spy))
    }

    fn create_recorder(&self, ctx: RecorderContext) -> Result<MockRecorder, HandleError> {
        self.make_recorder(ctx)
    }
}

// =========================================================================
// Mock settings sink
// =========================================================================

#[derive(Default)]
struct MockSink {
    saves: Mutex<Vec<RoomSettings>>,
    forgotten: Mutex<Vec<RoomId>>,
}

impl MockSink {
    fn save_count(&self) -> usize {
        self.saves.lock().len()
    }
}

impl SettingsSink for MockSink {
    fn mark_dirty(&self, settings: &RoomSettings) {
        self.saves.lock().push(settings.clone());
    }

    fn forget(&self, room_id: RoomId) {
        self.forgotten.lock().push(room_id);
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn settings(id: u64) -> RoomSettings {
    RoomSettings::new(RoomId(id))
}

fn room_with(
    settings: RoomSettings,
    backend: &Arc<MockBackend>,
    sink: &Arc<MockSink>,
) -> Room<MockBackend> {
    Room::new(
        RoomConfig::from_settings(settings),
        Arc::clone(backend),
        Arc::clone(sink) as Arc<dyn SettingsSink>,
    )
    .unwrap()
}

fn setup(id: u64) -> (Arc<MockBackend>, Arc<MockSink>, Room<MockBackend>) {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(id), &backend, &sink);
    (backend, sink, room)
}

/// Lets spawned recorder starts run as far as they can.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Polls `done` on a real clock, for multi-threaded tests.
async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    for _ in 0..300 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting until {what}");
}

/// The room agrees with its last live signal and holds at most one recorder.
fn is_settled(room: &Room<MockBackend>, backend: &MockBackend) -> bool {
    let alive = backend.census.alive.load(Ordering::SeqCst);
    if room.is_live() {
        room.recording_status() == RecordingStatus::Recording && room.has_recorder() && alive == 1
    } else {
        room.recording_status() == RecordingStatus::Stopped && !room.has_recorder() && alive == 0
    }
}

fn drain(rx: &mut broadcast::Receiver<RoomEvent>) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn log_lines(events: &[RoomEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RoomEvent::Log { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

fn segment() -> RecordedSegment {
    RecordedSegment {
        path: PathBuf::from("/records/100/part-001.flv"),
        duration: Duration::from_secs(1800),
        size_bytes: 512 * 1024 * 1024,
    }
}

// =========================================================================
// Construction
// =========================================================================

#[tokio::test]
async fn test_new_room_creates_and_starts_monitor() {
    let (backend, _sink, room) = setup(1);

    assert_eq!(backend.monitor_count(), 1);
    let monitor = backend.last_monitor();
    assert!(monitor.running.load(Ordering::SeqCst));
    assert_eq!(monitor.timing, settings(1).monitor_timing());
    assert!(room.has_monitor());
    assert!(!room.has_recorder());
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

#[tokio::test]
async fn test_new_room_without_monitoring_keeps_monitor_idle() {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let mut s = settings(1);
    s.is_monitor_enabled = false;
    s.log_title_only = false;

    let room = room_with(s, &backend, &sink);

    let monitor = backend.last_monitor();
    assert!(room.has_monitor(), "monitor object exists");
    assert_eq!(monitor.starts.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.stops.load(Ordering::SeqCst), 1);
    assert!(!monitor.running.load(Ordering::SeqCst));
}

#[test]
fn test_room_outside_runtime_is_an_error() {
    let backend = Arc::new(MockBackend::default());
    let sink: Arc<dyn SettingsSink> = Arc::new(MockSink::default());

    let result = Room::new(RoomConfig::from_settings(settings(1)), backend, sink);

    assert!(matches!(result, Err(RoomError::NoRuntime)));
}

#[tokio::test]
async fn test_construction_does_not_persist() {
    let (_backend, sink, _room) = setup(1);
    assert_eq!(sink.save_count(), 0);
}

// =========================================================================
// End-to-end through monitor events
// =========================================================================

#[tokio::test]
async fn test_live_then_title_end_to_end() {
    let (backend, _sink, room) = setup(100);
    let mut rx = room.subscribe();
    let monitor = backend.last_monitor();

    monitor.events.stream_status_changed(true);
    monitor.events.room_info_updated(RoomInfo {
        room_id: RoomId(100),
        short_room_id: ShortRoomId(7),
        title: "Hello".into(),
        user_name: "alice".into(),
    });
    settle().await;

    let events = drain(&mut rx);
    let logs = log_lines(&events);
    assert!(
        logs.iter().any(|l| l.contains("100") && l.contains("live")),
        "logs: {logs:?}"
    );
    let notifies = events
        .iter()
        .filter(|e| matches!(e, RoomEvent::Notify { .. }))
        .count();
    assert_eq!(notifies, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::TitleChanged { title, .. } if title.contains("Hello")
    )));
    assert_eq!(backend.recorder_count(), 1);
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
    assert_eq!(room.config().short_room_id, ShortRoomId(7));
    assert_eq!(room.config().user_name, "alice");
}

#[tokio::test]
async fn test_live_events_are_ordered_log_notify_start() {
    let (backend, _sink, room) = setup(1);
    let mut rx = room.subscribe();

    backend.last_monitor().events.stream_status_changed(true);
    settle().await;

    let events = drain(&mut rx);
    assert!(matches!(events[0], RoomEvent::Log { .. }));
    assert!(matches!(events[1], RoomEvent::Notify { .. }));
    assert!(matches!(
        events[2],
        RoomEvent::RecordingStatusChanged {
            status: RecordingStatus::Starting,
            ..
        }
    ));
}

#[tokio::test]
async fn test_live_with_monitoring_disabled_creates_no_recorder() {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let mut s = settings(1);
    s.is_monitor_enabled = false;
    s.log_title_only = false;
    let room = room_with(s, &backend, &sink);

    backend.last_monitor().events.stream_status_changed(true);
    settle().await;

    assert!(room.is_live());
    assert_eq!(backend.recorder_count(), 0);
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

#[tokio::test]
async fn test_notify_disabled_still_records() {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let mut s = settings(1);
    s.is_notify_enabled = false;
    let room = room_with(s, &backend, &sink);
    let mut rx = room.subscribe();

    room.set_live(true);
    settle().await;

    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, RoomEvent::Notify { .. })));
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

#[tokio::test]
async fn test_monitor_log_is_relayed() {
    let (backend, _sink, room) = setup(1);
    let mut rx = room.subscribe();

    backend.last_monitor().events.log("chat reconnected");

    assert_eq!(log_lines(&drain(&mut rx)), vec!["chat reconnected".to_string()]);
}

// =========================================================================
// StartRecorder guard
// =========================================================================

#[tokio::test]
async fn test_second_start_while_starting_is_ignored() {
    let backend = Arc::new(MockBackend::gated());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);

    room.set_live(true);
    settle().await;
    assert_eq!(room.recording_status(), RecordingStatus::Starting);

    let second = {
        let room = room.clone();
        tokio::spawn(async move { room.start_recorder().await })
    };
    settle().await;
    assert_eq!(backend.recorder_count(), 1);

    backend.release_all();
    second.await.unwrap();
    settle().await;

    assert_eq!(backend.recorder_count(), 1);
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

#[tokio::test]
async fn test_start_while_recording_is_ignored() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;

    room.start_recorder().await;

    assert_eq!(backend.recorder_count(), 1);
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

#[tokio::test]
async fn test_rapid_flips_never_overlap_recorders() {
    let backend = Arc::new(MockBackend::gated());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);

    for i in 0..6 {
        room.set_live(true);
        for _ in 0..i {
            tokio::task::yield_now().await;
        }
        room.set_live(false);
        tokio::task::yield_now().await;
    }
    room.set_live(true);
    settle().await;
    backend.release_all();
    settle().await;

    assert_eq!(backend.census.max_alive.load(Ordering::SeqCst), 1);
    assert_eq!(backend.census.alive.load(Ordering::SeqCst), 1);
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
    assert!(!backend.last_recorder().is_disposed());
}

#[tokio::test]
async fn test_stop_during_start_ends_stopped() {
    let backend = Arc::new(MockBackend::gated());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);

    room.set_live(true);
    settle().await;
    assert_eq!(room.recording_status(), RecordingStatus::Starting);

    room.set_live(false);
    settle().await;

    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
    assert!(!room.has_recorder());
    assert!(backend.last_recorder().is_disposed());
}

#[tokio::test]
async fn test_stop_during_start_is_not_reported_as_failure() {
    let backend = Arc::new(MockBackend::gated());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);
    room.set_live(true);
    settle().await;
    let mut rx = room.subscribe();

    room.set_live(false);
    settle().await;

    let logs = log_lines(&drain(&mut rx));
    assert!(
        !logs.iter().any(|l| l.contains("failed")),
        "logs: {logs:?}"
    );
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_live_again_during_slow_stop_still_records() {
    let backend = Arc::new(MockBackend::default());
    *backend.dispose_delay.lock() = Duration::from_millis(200);
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);

    room.set_live(true);
    wait_until("recording", || room.recording_status() == RecordingStatus::Recording).await;

    let offline = {
        let room = room.clone();
        std::thread::spawn(move || room.set_live(false))
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(room.recording_status(), RecordingStatus::Stopping);
    room.set_live(true);
    tokio::task::spawn_blocking(move || offline.join())
        .await
        .unwrap()
        .unwrap();

    wait_until("recording again", || {
        room.recording_status() == RecordingStatus::Recording
    })
    .await;
    assert!(room.is_live());
    assert_eq!(backend.recorder_count(), 2);
    assert_eq!(backend.census.max_alive.load(Ordering::SeqCst), 1);
    assert!(!backend.last_recorder().is_disposed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_live_flips_from_many_threads_settle_consistently() {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);

    for round in 0..10usize {
        let threads: Vec<_> = (0..4usize)
            .map(|t| {
                let room = room.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        room.set_live((i + t + round) % 2 == 0);
                    }
                })
            })
            .collect();
        let blocking: Vec<_> = (0..2usize)
            .map(|t| {
                let room = room.clone();
                tokio::task::spawn_blocking(move || {
                    for i in 0..50 {
                        room.set_live((i + t + round) % 3 == 0);
                    }
                })
            })
            .collect();

        for task in blocking {
            task.await.unwrap();
        }
        tokio::task::spawn_blocking(move || {
            for thread in threads {
                thread.join().unwrap();
            }
        })
        .await
        .unwrap();

        wait_until("the room settles", || is_settled(&room, &backend)).await;
        assert!(backend.census.max_alive.load(Ordering::SeqCst) <= 1);
    }
}

#[tokio::test]
async fn test_stop_before_start_task_runs_creates_nothing() {
    let (backend, _sink, room) = setup(1);

    room.set_live(true);
    room.set_live(false);
    settle().await;

    assert_eq!(backend.recorder_count(), 0);
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn test_start_failure_reverts_to_stopped_and_logs() {
    let (backend, _sink, room) = setup(1);
    backend.fail_start.store(true, Ordering::SeqCst);
    let mut rx = room.subscribe();

    room.set_live(true);
    settle().await;

    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
    assert!(!room.has_recorder());
    assert!(backend.last_recorder().is_disposed());
    let logs = log_lines(&drain(&mut rx));
    assert!(
        logs.iter().any(|l| l.contains("recorder start failed")),
        "logs: {logs:?}"
    );
}

#[tokio::test]
async fn test_construction_failure_reverts_to_stopped_and_logs() {
    let (backend, _sink, room) = setup(1);
    backend.fail_create.store(true, Ordering::SeqCst);
    let mut rx = room.subscribe();

    room.set_live(true);
    settle().await;

    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
    let logs = log_lines(&drain(&mut rx));
    assert!(logs.iter().any(|l| l.contains("no stream url")));
}

#[tokio::test]
async fn test_next_live_flip_retries_after_failure() {
    let (backend, _sink, room) = setup(1);
    backend.fail_start.store(true, Ordering::SeqCst);
    room.set_live(true);
    settle().await;

    backend.fail_start.store(false, Ordering::SeqCst);
    room.set_live(false);
    room.set_live(true);
    settle().await;

    assert_eq!(backend.recorder_count(), 2);
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

// =========================================================================
// Recorder lifecycle
// =========================================================================

#[tokio::test]
async fn test_going_offline_disposes_recorder() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;
    let mut rx = room.subscribe();

    room.set_live(false);

    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
    assert!(backend.last_recorder().is_disposed());
    let statuses: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            RoomEvent::RecordingStatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![RecordingStatus::Stopping, RecordingStatus::Stopped]
    );
}

#[tokio::test]
async fn test_recorder_receives_room_details() {
    let (backend, _sink, room) = setup(1);
    room.set_title("Speedrun");
    room.set_user_name("bob");

    room.set_live(true);
    settle().await;

    let recorder = backend.last_recorder();
    assert_eq!(recorder.ctx.room_id, RoomId(1));
    assert_eq!(recorder.ctx.title, "Speedrun");
    assert_eq!(recorder.ctx.user_name, "bob");
    assert_eq!(recorder.ctx.timing, settings(1).recorder_timing());
}

#[tokio::test]
async fn test_recorder_events_are_relayed() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;
    let mut rx = room.subscribe();
    let recorder = backend.last_recorder();

    recorder.ctx.events.log("segment rotated");
    recorder.ctx.events.record_completed(segment());

    let events = drain(&mut rx);
    assert_eq!(log_lines(&events), vec!["segment rotated".to_string()]);
    assert!(events.contains(&RoomEvent::RecordCompleted {
        room_id: RoomId(1),
        segment: segment(),
    }));
}

#[tokio::test]
async fn test_segment_flushed_while_stopping_is_relayed() {
    let backend = Arc::new(MockBackend::default());
    backend.flush_on_dispose.store(true, Ordering::SeqCst);
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);
    room.set_live(true);
    settle().await;
    let mut rx = room.subscribe();
    let recorder = backend.last_recorder();

    room.set_live(false);

    let events = drain(&mut rx);
    let completed = events
        .iter()
        .position(|e| matches!(e, RoomEvent::RecordCompleted { .. }))
        .expect("final segment relayed");
    let stopped = events
        .iter()
        .position(|e| {
            matches!(
                e,
                RoomEvent::RecordingStatusChanged {
                    status: RecordingStatus::Stopped,
                    ..
                }
            )
        })
        .unwrap();
    assert!(completed < stopped);

    recorder.ctx.events.record_completed(segment());
    assert!(drain(&mut rx).is_empty(), "nothing after dispose returned");
}

#[tokio::test]
async fn test_segment_flushed_when_recorder_finishes_is_relayed() {
    let backend = Arc::new(MockBackend::default());
    backend.flush_on_dispose.store(true, Ordering::SeqCst);
    let sink = Arc::new(MockSink::default());
    let room = room_with(settings(1), &backend, &sink);
    room.set_live(true);
    settle().await;
    let mut rx = room.subscribe();

    backend.last_recorder().ctx.events.finished();

    let completed = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RoomEvent::RecordCompleted { .. }))
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_recorder_finishing_returns_to_stopped() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;
    let recorder = backend.last_recorder();

    recorder.ctx.events.finished();

    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
    assert!(!room.has_recorder());
    assert!(recorder.is_disposed());
}

#[tokio::test]
async fn test_events_from_disposed_recorder_are_ignored() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;
    let old = backend.last_recorder();
    room.set_live(false);
    let mut rx = room.subscribe();

    old.ctx.events.record_completed(segment());
    old.ctx.events.finished();

    assert!(drain(&mut rx).is_empty());
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

// =========================================================================
// Monitor lifecycle
// =========================================================================

#[tokio::test]
async fn test_disabling_monitoring_keeps_monitor_for_title_logging() {
    let (backend, _sink, room) = setup(1);
    let monitor = backend.last_monitor();
    room.set_live(true);
    settle().await;

    room.set_monitor_enabled(false);

    assert!(monitor.running.load(Ordering::SeqCst));
    assert_eq!(monitor.stops.load(Ordering::SeqCst), 0);
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

#[tokio::test]
async fn test_disabling_monitoring_without_title_logging_pauses_monitor() {
    let (backend, _sink, room) = setup(1);
    room.set_log_title_only(false);

    room.set_monitor_enabled(false);

    let monitor = backend.last_monitor();
    assert!(!monitor.running.load(Ordering::SeqCst));
    assert!(room.has_monitor(), "paused, not disposed");
}

#[tokio::test]
async fn test_title_logging_restarts_idle_monitor() {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let mut s = settings(1);
    s.is_monitor_enabled = false;
    s.log_title_only = false;
    let room = room_with(s, &backend, &sink);
    let monitor = backend.last_monitor();

    room.set_log_title_only(true);

    assert!(monitor.running.load(Ordering::SeqCst));
    assert_eq!(monitor.starts.load(Ordering::SeqCst), 2);
    assert_eq!(backend.monitor_count(), 1);
}

#[tokio::test]
async fn test_enabling_monitoring_recreates_missing_monitor_and_records() {
    let (backend, _sink, room) = setup(1);
    room.set_monitor_enabled(false);
    room.stop_monitor();
    room.set_live(true);
    assert!(!room.has_monitor());

    room.set_monitor_enabled(true);
    settle().await;

    assert_eq!(backend.monitor_count(), 2);
    assert!(backend.last_monitor().running.load(Ordering::SeqCst));
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

#[tokio::test]
async fn test_check_interval_hot_reloads_same_monitor() {
    let (backend, _sink, room) = setup(1);
    let monitor = backend.last_monitor();

    room.set_check_interval_sec(60);

    assert_eq!(backend.monitor_count(), 1);
    let reloads = monitor.reloads.lock().clone();
    assert_eq!(reloads.len(), 1);
    assert_eq!(reloads[0].check_interval, Duration::from_secs(60));
}

#[tokio::test]
async fn test_danmaku_retry_hot_reloads() {
    let (backend, _sink, room) = setup(1);

    room.set_danmaku_retry_ms(500);

    let reloads = backend.last_monitor().reloads.lock().clone();
    assert_eq!(reloads[0].danmaku_retry, Duration::from_millis(500));
}

#[tokio::test]
async fn test_start_monitor_replaces_instance_and_drops_stale_events() {
    let (backend, _sink, room) = setup(1);
    let old = backend.last_monitor();

    room.start_monitor();
    old.events.stream_status_changed(true);

    assert!(old.disposed.load(Ordering::SeqCst));
    assert_eq!(backend.monitor_count(), 2);
    assert!(!room.is_live(), "stale monitor must not drive the room");

    backend.last_monitor().events.stream_status_changed(true);
    assert!(room.is_live());
}

#[tokio::test]
async fn test_dispose_releases_collaborators() {
    let (backend, _sink, room) = setup(1);
    room.set_live(true);
    settle().await;

    room.dispose();

    assert!(backend.last_monitor().disposed.load(Ordering::SeqCst));
    assert!(backend.last_recorder().is_disposed());
    assert!(!room.has_monitor());
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

#[tokio::test]
async fn test_disposed_room_ignores_setters() {
    let (backend, sink, room) = setup(1);
    room.set_monitor_enabled(false);
    let saves = sink.save_count();

    room.dispose();
    room.set_monitor_enabled(true);
    room.set_notify_enabled(false);
    room.set_live(true);
    room.start_monitor();
    settle().await;

    assert!(room.is_disposed());
    assert_eq!(sink.save_count(), saves);
    assert_eq!(backend.monitor_count(), 1);
    assert_eq!(backend.recorder_count(), 0);
    assert!(!room.has_monitor());
    assert!(!room.settings().is_monitor_enabled);
}

#[tokio::test]
async fn test_disposed_room_refuses_explicit_start() {
    let (backend, _sink, room) = setup(1);
    room.dispose();

    room.start_recorder().await;

    assert_eq!(backend.recorder_count(), 0);
    assert_eq!(room.recording_status(), RecordingStatus::Stopped);
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test]
async fn test_title_change_never_persists() {
    let (_backend, sink, room) = setup(1);

    room.set_title("Hello");
    room.set_live(true);
    room.set_user_name("alice");

    assert_eq!(sink.save_count(), 0);
}

#[tokio::test]
async fn test_notify_toggle_persists_exactly_once() {
    let (_backend, sink, room) = setup(1);

    room.set_notify_enabled(false);

    assert_eq!(sink.save_count(), 1);
    assert!(!sink.saves.lock()[0].is_notify_enabled);
}

#[tokio::test]
async fn test_every_persisted_field_persists() {
    let (_backend, sink, room) = setup(1);

    room.set_danmaku_retry_ms(1000);
    room.set_check_interval_sec(60);
    room.set_stream_retry_ms(1000);
    room.set_stream_connect_timeout_ms(1000);
    room.set_monitor_enabled(false);
    room.set_notify_enabled(false);
    room.set_log_title_only(false);

    assert_eq!(sink.save_count(), 7);
}

#[tokio::test]
async fn test_setting_same_value_is_a_no_op() {
    let (backend, sink, room) = setup(1);

    room.set_notify_enabled(true);
    room.set_check_interval_sec(300);
    room.set_live(false);

    assert_eq!(sink.save_count(), 0);
    assert!(backend.last_monitor().reloads.lock().is_empty());
}

// =========================================================================
// RoomManager
// =========================================================================

fn manager() -> (Arc<MockBackend>, Arc<MockSink>, RoomManager<MockBackend>) {
    let backend = Arc::new(MockBackend::default());
    let sink = Arc::new(MockSink::default());
    let manager = RoomManager::new(Arc::clone(&backend), Arc::clone(&sink) as Arc<dyn SettingsSink>);
    (backend, sink, manager)
}

#[tokio::test]
async fn test_manager_add_room_persists_it() {
    let (backend, sink, mut manager) = manager();

    let room = manager.add_room(RoomInfo::new(RoomId(5))).unwrap();

    assert_eq!(room.id(), RoomId(5));
    assert_eq!(manager.len(), 1);
    assert_eq!(backend.monitor_count(), 1);
    assert_eq!(sink.save_count(), 1);
}

#[tokio::test]
async fn test_manager_rejects_duplicates_and_invalid_ids() {
    let (_backend, _sink, mut manager) = manager();
    manager.add_room(RoomInfo::new(RoomId(5))).unwrap();

    assert!(matches!(
        manager.add_room(RoomInfo::new(RoomId(5))),
        Err(RoomError::AlreadyExists(RoomId(5)))
    ));
    assert!(matches!(
        manager.restore(settings(0)),
        Err(RoomError::Invalid(_))
    ));
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_manager_restore_does_not_persist() {
    let (_backend, sink, mut manager) = manager();
    let mut s = settings(9);
    s.check_interval_sec = 30;

    let room = manager.restore(s.clone()).unwrap();

    assert_eq!(room.settings(), s);
    assert_eq!(sink.save_count(), 0);
}

#[tokio::test]
async fn test_manager_keeps_insertion_order() {
    let (_backend, _sink, mut manager) = manager();
    for id in [3, 1, 2] {
        manager.restore(settings(id)).unwrap();
    }

    assert_eq!(manager.room_ids(), vec![RoomId(3), RoomId(1), RoomId(2)]);
    let ids: Vec<_> = manager.rooms().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![RoomId(3), RoomId(1), RoomId(2)]);
}

#[tokio::test]
async fn test_manager_remove_room_disposes_and_forgets() {
    let (backend, sink, mut manager) = manager();
    manager.restore(settings(1)).unwrap();

    manager.remove_room(RoomId(1)).unwrap();

    assert!(manager.is_empty());
    assert!(manager.get(RoomId(1)).is_none());
    assert!(backend.last_monitor().disposed.load(Ordering::SeqCst));
    assert_eq!(*sink.forgotten.lock(), vec![RoomId(1)]);
    assert!(matches!(
        manager.remove_room(RoomId(1)),
        Err(RoomError::NotFound(RoomId(1)))
    ));
}

#[tokio::test]
async fn test_manager_removed_room_handle_cannot_persist() {
    let (_backend, sink, mut manager) = manager();
    let room = manager.restore(settings(7)).unwrap();

    manager.remove_room(RoomId(7)).unwrap();
    room.set_notify_enabled(false);
    room.set_check_interval_sec(60);

    assert_eq!(sink.save_count(), 0);
    assert_eq!(*sink.forgotten.lock(), vec![RoomId(7)]);
}

#[tokio::test]
async fn test_manager_events_from_all_rooms() {
    let (_backend, _sink, mut manager) = manager();
    let mut rx = manager.subscribe();
    let a = manager.restore(settings(1)).unwrap();
    let b = manager.restore(settings(2)).unwrap();

    a.set_title("first");
    b.set_title("second");

    let rooms: Vec<_> = drain(&mut rx).iter().map(RoomEvent::room_id).collect();
    assert_eq!(rooms, vec![RoomId(1), RoomId(2)]);
}

#[tokio::test]
async fn test_manager_shutdown_disposes_every_room() {
    let (backend, sink, mut manager) = manager();
    manager.restore(settings(1)).unwrap();
    manager.restore(settings(2)).unwrap();

    manager.shutdown();

    assert!(manager.is_empty());
    for monitor in backend.monitors.lock().iter() {
        assert!(monitor.disposed.load(Ordering::SeqCst));
    }
    assert!(sink.forgotten.lock().is_empty(), "settings survive shutdown");
}

// =========================================================================
// PollingMonitor
// =========================================================================

#[derive(Default)]
struct FakeSource {
    live: AtomicBool,
    fail: AtomicBool,
    fetches: AtomicUsize,
}

impl FakeSource {
    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl StatusSource for FakeSource {
    async fn fetch(&self, room_id: RoomId) -> Result<RoomStatus, HandleError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandleError::Connect("timed out".into()));
        }
        Ok(RoomStatus {
            info: RoomInfo {
                room_id,
                short_room_id: ShortRoomId(0),
                title: "Polled title".into(),
                user_name: "carol".into(),
            },
            is_live: self.live.load(Ordering::SeqCst),
        })
    }
}

#[derive(Default)]
struct PollingBackend {
    source: Arc<FakeSource>,
    recorders: MockBackend,
}

impl Backend for PollingBackend {
    type Monitor = PollingMonitor<FakeSource>;
    type Recorder = MockRecorder;

    fn create_monitor(&self, ctx: MonitorContext) -> Result<Self::Monitor, HandleError> {
        Ok(PollingMonitor::new(Arc::clone(&self.source), ctx).with_jitter(Duration::ZERO))
    }

    fn create_recorder(&self, ctx: RecorderContext) -> Result<MockRecorder, HandleError> {
        self.recorders.make_recorder(ctx)
    }
}

fn polling_room(s: RoomSettings) -> (Arc<PollingBackend>, Room<PollingBackend>) {
    let backend = Arc::new(PollingBackend::default());
    let sink: Arc<dyn SettingsSink> = Arc::new(MockSink::default());
    let room = Room::new(RoomConfig::from_settings(s), Arc::clone(&backend), sink).unwrap();
    (backend, room)
}

fn fast_settings() -> RoomSettings {
    let mut s = settings(100);
    s.check_interval_sec = 10;
    s
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_drives_room_live() {
    let (backend, room) = polling_room(fast_settings());
    backend.source.live.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(10)).await;
    settle().await;

    assert_eq!(backend.source.fetches(), 1);
    assert!(room.is_live());
    assert_eq!(room.title(), "Polled title");
    assert_eq!(room.recording_status(), RecordingStatus::Recording);
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_polls_on_interval() {
    let (backend, _room) = polling_room(fast_settings());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.source.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_retries_failures_early_and_logs() {
    let (backend, room) = polling_room(fast_settings());
    let mut rx = room.subscribe();
    backend.source.fail.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.source.fetches(), 1);

    // Default retry delay is 2s, well short of the 10s interval.
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(backend.source.fetches(), 2);

    let logs = log_lines(&drain(&mut rx));
    assert!(logs.iter().any(|l| l.contains("status check failed")));
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_pauses_and_resumes() {
    let (backend, room) = polling_room(fast_settings());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.source.fetches(), 1);

    room.set_log_title_only(false);
    room.set_monitor_enabled(false);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.source.fetches(), 1, "paused monitor must not poll");

    room.set_monitor_enabled(true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_picks_up_shorter_interval() {
    let mut s = fast_settings();
    s.check_interval_sec = 300;
    let (backend, room) = polling_room(s);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.source.fetches(), 1);

    room.set_check_interval_sec(5);
    tokio::time::sleep(Duration::from_millis(5_010)).await;

    assert_eq!(backend.source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_polling_monitor_stops_after_dispose() {
    let (backend, room) = polling_room(fast_settings());
    tokio::time::sleep(Duration::from_millis(10)).await;

    room.dispose();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(backend.source.fetches(), 1);
}

#[tokio::test]
async fn test_polling_monitor_rejects_use_after_dispose() {
    let ctx = MonitorContext {
        room_id: RoomId(1),
        timing: MonitorTiming::default(),
        events: MonitorEvents::detached(),
        runtime: tokio::runtime::Handle::current(),
    };
    let monitor = PollingMonitor::new(Arc::new(FakeSource::default()), ctx);

    monitor.start().unwrap();
    assert!(monitor.is_running());
    monitor.dispose().unwrap();
    monitor.dispose().unwrap();

    assert!(!monitor.is_running());
    assert_eq!(monitor.start(), Err(HandleError::Disposed));
    assert_eq!(
        monitor.apply_setting_change(MonitorTiming::default()),
        Err(HandleError::Disposed)
    );
}
