//! The room orchestrator.
//!
//! A [`Room`] is a cheap, cloneable handle over shared state. Setters
//! mutate the configuration under a short lock, release it, and then run
//! the dispatch plan on the calling thread. No lock is held while a
//! collaborator is called, except the start guard, which is an async
//! mutex held across the recorder's `start`.
//!
//! # Recorder lifecycle
//!
//! ```text
//! StartRecorder (spawned)                StopRecorder (synchronous)
//! ───────────────────────                ──────────────────────────
//! capture stop epoch                     under the state lock:
//! lock start guard                         live again? → skip
//! epoch moved? → give up                   bump stop epoch
//! under the state lock:                    drain recorder from slot
//!   Stopping? → defer until stopped        status → Stopping
//!   not Stopped? → ignore                none → done
//!   no longer live? → give up            dispose (events still relayed)
//!   status → Starting                    status → Stopped
//! construct + install recorder           deferred start? → spawn it
//! epoch moved? → undo, Stopped
//! await start()
//!   Ok  → Recording (if still installed)
//!   Err → log, uninstall, Stopped
//! ```
//!
//! Once [`Room::dispose`] has run the room ignores setters and never
//! creates collaborators again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use autorec_model::{RecordedSegment, RoomId, RoomInfo, RoomSettings, ShortRoomId};
use autorec_settings::SettingsSink;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::dispatch::{self, replace};
use crate::events::{MonitorListener, RecorderListener};
use crate::slot::Slot;
use crate::{
    Backend, Command, FieldChange, HandleError, MonitorContext, MonitorEvents, MonitorHandle,
    RecorderContext, RecorderEvents, RecorderHandle, RecordingStatus, RoomConfig, RoomError,
    RoomEvent,
};

/// Capacity of a standalone room's event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Handle to one watched room.
///
/// Clones share the same room. The room lives as long as any handle (or
/// an in-flight recorder start) does; call [`Room::dispose`] to release
/// its collaborators.
pub struct Room<B: Backend> {
    shared: Arc<Shared<B>>,
}

impl<B: Backend> Clone for Room<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<B: Backend> {
    id: RoomId,
    backend: Arc<B>,
    settings: Arc<dyn SettingsSink>,
    runtime: Handle,
    events: broadcast::Sender<RoomEvent>,
    state: Mutex<RoomConfig>,
    monitor: Mutex<Slot<B::Monitor>>,
    recorder: Mutex<Slot<B::Recorder>>,
    /// Serializes recorder starts. Held across the recorder's `start`.
    start_guard: tokio::sync::Mutex<()>,
    /// Bumped by every stop. A start that sees it move gives up.
    stop_epoch: AtomicU64,
    /// Set by a start that found a stop still disposing. The stop picks it
    /// up once it reaches Stopped.
    deferred_start: AtomicBool,
    disposed: AtomicBool,
}

/// Who asked for a recorder start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartCause {
    /// The dispatch table, reacting to a live or monitoring change. Only
    /// proceeds while the room still wants a recording.
    Dispatch,
    /// An explicit [`Room::start_recorder`] call.
    Caller,
}

impl<B: Backend> Room<B> {
    /// Creates a room with its own event channel and immediately creates
    /// its monitor.
    ///
    /// # Errors
    /// [`RoomError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new(
        config: RoomConfig,
        backend: Arc<B>,
        settings: Arc<dyn SettingsSink>,
    ) -> Result<Self, RoomError> {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self::with_events(config, backend, settings, events)
    }

    /// Like [`Room::new`], publishing into an existing channel. Used by
    /// [`RoomManager`](crate::RoomManager) so all rooms share one stream.
    pub fn with_events(
        mut config: RoomConfig,
        backend: Arc<B>,
        settings: Arc<dyn SettingsSink>,
        events: broadcast::Sender<RoomEvent>,
    ) -> Result<Self, RoomError> {
        let runtime = Handle::try_current().map_err(|_| RoomError::NoRuntime)?;

        // Live state and recording status are observed, never restored.
        config.is_live = false;
        config.recording_status = RecordingStatus::Stopped;

        let shared = Arc::new(Shared {
            id: config.room_id(),
            backend,
            settings,
            runtime,
            events,
            state: Mutex::new(config),
            monitor: Mutex::new(Slot::new()),
            recorder: Mutex::new(Slot::new()),
            start_guard: tokio::sync::Mutex::new(()),
            stop_epoch: AtomicU64::new(0),
            deferred_start: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });
        tracing::info!(room_id = %shared.id, "room created");
        shared.start_monitor();

        Ok(Self { shared })
    }

    // -- Queries ------------------------------------------------------------

    pub fn id(&self) -> RoomId {
        self.shared.id
    }

    /// A snapshot of the whole configuration.
    pub fn config(&self) -> RoomConfig {
        self.shared.state.lock().clone()
    }

    pub fn settings(&self) -> RoomSettings {
        self.shared.state.lock().settings.clone()
    }

    pub fn recording_status(&self) -> RecordingStatus {
        self.shared.state.lock().recording_status
    }

    pub fn is_live(&self) -> bool {
        self.shared.state.lock().is_live
    }

    pub fn title(&self) -> String {
        self.shared.state.lock().title.clone()
    }

    pub fn has_monitor(&self) -> bool {
        self.shared.monitor.lock().is_occupied()
    }

    pub fn has_recorder(&self) -> bool {
        self.shared.recorder.lock().is_occupied()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Subscribes to this room's events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.shared.events.subscribe()
    }

    // -- Derived fields -----------------------------------------------------

    pub fn set_live(&self, is_live: bool) {
        self.shared.mutate(|c| {
            replace(&mut c.is_live, is_live).map(|(old, new)| FieldChange::Live { old, new })
        });
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.shared.mutate(|c| {
            replace(&mut c.title, title).map(|(old, new)| FieldChange::Title { old, new })
        });
    }

    pub fn set_user_name(&self, user_name: impl Into<String>) {
        let user_name = user_name.into();
        self.shared.mutate(|c| {
            replace(&mut c.user_name, user_name).map(|(old, new)| FieldChange::UserName { old, new })
        });
    }

    pub fn set_short_room_id(&self, short_room_id: ShortRoomId) {
        self.shared.mutate(|c| {
            replace(&mut c.short_room_id, short_room_id)
                .map(|(old, new)| FieldChange::ShortRoomId { old, new })
        });
    }

    /// Applies a fresh room descriptor: short id, streamer name, title.
    pub fn apply_info(&self, info: RoomInfo) {
        self.shared.apply_info(info);
    }

    // -- Persisted fields ---------------------------------------------------

    pub fn set_danmaku_retry_ms(&self, value: u32) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.danmaku_retry_ms, value)
                .map(|(old, new)| FieldChange::DanmakuRetryMs { old, new })
        });
    }

    pub fn set_check_interval_sec(&self, value: u32) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.check_interval_sec, value)
                .map(|(old, new)| FieldChange::CheckIntervalSec { old, new })
        });
    }

    pub fn set_stream_retry_ms(&self, value: u32) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.stream_retry_ms, value)
                .map(|(old, new)| FieldChange::StreamRetryMs { old, new })
        });
    }

    pub fn set_stream_connect_timeout_ms(&self, value: u32) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.stream_connect_timeout_ms, value)
                .map(|(old, new)| FieldChange::StreamConnectTimeoutMs { old, new })
        });
    }

    pub fn set_monitor_enabled(&self, enabled: bool) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.is_monitor_enabled, enabled)
                .map(|(old, new)| FieldChange::MonitorEnabled { old, new })
        });
    }

    pub fn set_notify_enabled(&self, enabled: bool) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.is_notify_enabled, enabled)
                .map(|(old, new)| FieldChange::NotifyEnabled { old, new })
        });
    }

    pub fn set_log_title_only(&self, enabled: bool) {
        self.shared.mutate(|c| {
            replace(&mut c.settings.log_title_only, enabled)
                .map(|(old, new)| FieldChange::LogTitleOnly { old, new })
        });
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Runs the guarded recorder start to completion.
    ///
    /// A start while a recorder is already starting or recording is
    /// silently ignored. Failures are logged and leave the room Stopped.
    pub async fn start_recorder(&self) {
        let epoch = self.shared.stop_epoch.load(Ordering::SeqCst);
        self.shared.start_recorder(epoch, StartCause::Caller).await;
    }

    /// Disposes the recorder if there is one. Never blocks on a start in
    /// flight; that start notices and backs off.
    pub fn stop_recorder(&self) {
        self.shared.stop_recorder();
    }

    /// Replaces the monitor with a fresh instance and starts it.
    pub fn start_monitor(&self) {
        self.shared.start_monitor();
    }

    /// Disposes the monitor.
    pub fn stop_monitor(&self) {
        self.shared.stop_monitor();
    }

    /// Stops the recorder and disposes the monitor. Late events from
    /// either are ignored afterwards, and so is every later setter.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.stop_recorder();
        self.shared.stop_monitor();
        tracing::info!(room_id = %self.shared.id, "room disposed");
    }
}

impl<B: Backend> std::fmt::Debug for Room<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.shared.id)
            .field("recording_status", &self.recording_status())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Shared: the actual orchestration
// ---------------------------------------------------------------------------

impl<B: Backend> Shared<B> {
    /// Applies one field mutation and runs its dispatch plan.
    fn mutate(self: &Arc<Self>, apply: impl FnOnce(&mut RoomConfig) -> Option<FieldChange>) {
        if self.is_disposed() {
            tracing::debug!(room_id = %self.id, "room disposed, change ignored");
            return;
        }
        let (change, snapshot) = {
            let mut state = self.state.lock();
            let Some(change) = apply(&mut *state) else {
                return;
            };
            (change, state.clone())
        };

        tracing::trace!(room_id = %self.id, field = ?change.field(), "field changed");
        for command in dispatch::plan(&change, &snapshot) {
            // A dispose on another thread ends the plan.
            if self.is_disposed() {
                break;
            }
            self.execute(command, &snapshot);
        }
    }

    fn execute(self: &Arc<Self>, command: Command, snapshot: &RoomConfig) {
        match command {
            Command::Emit(event) => self.emit(event),
            Command::StartRecorder => self.spawn_start_recorder(),
            Command::StopRecorder => self.stop_unwanted_recorder(),
            Command::EnsureMonitorStarted => self.ensure_monitor_started(),
            Command::PauseMonitor => self.pause_monitor(),
            Command::ApplyMonitorTiming(timing) => {
                let current = self.monitor.lock().get();
                if let Some(monitor) = current {
                    if let Err(e) = monitor.apply_setting_change(timing) {
                        self.report("monitor setting change failed", &e);
                    }
                }
            }
            Command::Persist => self.settings.mark_dirty(&snapshot.settings),
        }
    }

    fn apply_info(self: &Arc<Self>, info: RoomInfo) {
        if info.room_id != self.id && info.room_id != RoomId::default() {
            tracing::debug!(
                room_id = %self.id,
                reported = %info.room_id,
                "room info for a different id, identity kept"
            );
        }
        self.mutate(|c| {
            replace(&mut c.short_room_id, info.short_room_id)
                .map(|(old, new)| FieldChange::ShortRoomId { old, new })
        });
        self.mutate(|c| {
            replace(&mut c.user_name, info.user_name)
                .map(|(old, new)| FieldChange::UserName { old, new })
        });
        self.mutate(|c| {
            replace(&mut c.title, info.title).map(|(old, new)| FieldChange::Title { old, new })
        });
    }

    fn emit(&self, event: RoomEvent) {
        tracing::debug!(room_id = %self.id, ?event, "room event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn log(&self, message: String) {
        self.emit(RoomEvent::Log {
            room_id: self.id,
            message,
        });
    }

    /// Logs a collaborator failure and relays it as a log event.
    fn report(&self, what: &str, error: &HandleError) {
        tracing::warn!(room_id = %self.id, error = %error, "{what}");
        self.log(format!("[{}] {what}: {error}", self.id));
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Moves the recording status along a legal edge. Returns `false`
    /// (and changes nothing) for an illegal one.
    fn transition(&self, target: RecordingStatus) -> bool {
        let moved = self.advance(&mut self.state.lock(), target);
        if moved {
            self.announce(target);
        }
        moved
    }

    /// The locked half of [`transition`](Self::transition). The caller
    /// announces the new status after releasing the lock.
    fn advance(&self, state: &mut RoomConfig, target: RecordingStatus) -> bool {
        let current = state.recording_status;
        if !current.can_transition_to(target) {
            tracing::trace!(room_id = %self.id, %current, %target, "status transition skipped");
            return false;
        }
        state.recording_status = target;
        true
    }

    fn announce(&self, status: RecordingStatus) {
        tracing::debug!(room_id = %self.id, %status, "recording status changed");
        self.emit(RoomEvent::RecordingStatusChanged {
            room_id: self.id,
            status,
        });
    }

    // -- Recorder -----------------------------------------------------------

    fn spawn_start_recorder(self: &Arc<Self>) {
        let epoch = self.stop_epoch.load(Ordering::SeqCst);
        let shared = Arc::clone(self);
        self.runtime
            .spawn(async move { shared.start_recorder(epoch, StartCause::Dispatch).await });
    }

    async fn start_recorder(self: &Arc<Self>, epoch: u64, cause: StartCause) {
        let _guard = self.start_guard.lock().await;

        if self.is_disposed() {
            return;
        }
        if self.stop_epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(room_id = %self.id, "recorder start superseded by a stop");
            return;
        }

        let snapshot = {
            let mut state = self.state.lock();
            match state.recording_status {
                RecordingStatus::Stopped => {}
                RecordingStatus::Stopping => {
                    self.deferred_start.store(true, Ordering::SeqCst);
                    tracing::debug!(room_id = %self.id, "recorder start deferred until stopped");
                    return;
                }
                status => {
                    tracing::debug!(room_id = %self.id, %status, "recorder start ignored");
                    return;
                }
            }
            if cause == StartCause::Dispatch && !state.wants_recording() {
                tracing::debug!(room_id = %self.id, "recorder start no longer wanted");
                return;
            }
            state.recording_status = RecordingStatus::Starting;
            state.clone()
        };
        self.announce(RecordingStatus::Starting);

        let stale = self.recorder.lock().drain();
        if let Some((stale_generation, stale)) = stale {
            tracing::warn!(room_id = %self.id, "disposing stale recorder");
            self.dispose_recorder(stale_generation, &stale);
        }

        let generation = self.recorder.lock().reserve();
        let listener: std::sync::Weak<dyn RecorderListener> = Arc::downgrade(self) as _;
        let ctx = RecorderContext {
            room_id: self.id,
            user_name: snapshot.user_name,
            title: snapshot.title,
            timing: snapshot.settings.recorder_timing(),
            events: RecorderEvents::new(listener, generation),
            runtime: self.runtime.clone(),
        };
        let recorder = match self.backend.create_recorder(ctx) {
            Ok(recorder) => Arc::new(recorder),
            Err(e) => {
                self.report("recorder construction failed", &e);
                self.transition(RecordingStatus::Stopped);
                return;
            }
        };

        let displaced = self
            .recorder
            .lock()
            .install(generation, Arc::clone(&recorder));
        if let Some(displaced) = displaced {
            if let Err(e) = displaced.dispose() {
                self.report("recorder dispose failed", &e);
            }
        }

        if self.stop_epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(room_id = %self.id, "stop raced recorder start");
            let raced = self.recorder.lock().drain_if(generation);
            if let Some(raced) = raced {
                self.dispose_recorder(generation, &raced);
                self.transition(RecordingStatus::Stopped);
            }
            return;
        }

        tracing::info!(room_id = %self.id, generation, "starting recorder");
        match recorder.start().await {
            Ok(()) => {
                let current = self.recorder.lock().is_current(generation);
                if current && self.transition(RecordingStatus::Recording) {
                    tracing::info!(room_id = %self.id, "recording");
                } else {
                    tracing::debug!(room_id = %self.id, "recorder started after being replaced");
                }
            }
            Err(e) => {
                // A start cut short by a stop is not a failure.
                let failed = self.recorder.lock().drain_if(generation);
                if let Some(failed) = failed {
                    self.report("recorder start failed", &e);
                    self.dispose_recorder(generation, &failed);
                    self.transition(RecordingStatus::Stopped);
                } else {
                    tracing::debug!(
                        room_id = %self.id,
                        error = %e,
                        "start of a stopped recorder ended"
                    );
                }
            }
        }
    }

    /// Unconditional stop, for callers and dispose.
    fn stop_recorder(self: &Arc<Self>) {
        self.stop_recorder_when(|_| true);
    }

    /// StopRecorder from the dispatch table. Skipped when a newer change
    /// already wants a recording again; its start stays in effect.
    fn stop_unwanted_recorder(self: &Arc<Self>) {
        self.stop_recorder_when(|state| !state.wants_recording());
    }

    fn stop_recorder_when(self: &Arc<Self>, should_stop: impl FnOnce(&RoomConfig) -> bool) {
        // Draining and entering Stopping happen under one state lock so a
        // concurrent start sees either the recorder or the Stopping status.
        let (taken, stopping) = {
            let mut state = self.state.lock();
            if !should_stop(&state) {
                tracing::debug!(room_id = %self.id, "recorder stop superseded");
                return;
            }
            self.stop_epoch.fetch_add(1, Ordering::SeqCst);
            let taken = self.recorder.lock().drain();
            let stopping = taken.is_some() && self.advance(&mut state, RecordingStatus::Stopping);
            (taken, stopping)
        };
        let Some((generation, recorder)) = taken else {
            return;
        };
        tracing::info!(room_id = %self.id, "stopping recorder");
        if stopping {
            self.announce(RecordingStatus::Stopping);
        }
        self.finish_stop(generation, &recorder);
    }

    /// Disposes a drained recorder, settles at Stopped and runs any start
    /// that was deferred while the dispose was in progress.
    fn finish_stop(self: &Arc<Self>, generation: u64, recorder: &B::Recorder) {
        self.dispose_recorder(generation, recorder);

        let (stopped, restart) = {
            let mut state = self.state.lock();
            let stopped = self.advance(&mut state, RecordingStatus::Stopped);
            let deferred = self.deferred_start.swap(false, Ordering::SeqCst);
            (stopped, deferred && state.wants_recording() && !self.is_disposed())
        };
        if stopped {
            self.announce(RecordingStatus::Stopped);
        }
        if restart {
            tracing::debug!(room_id = %self.id, "running deferred recorder start");
            self.spawn_start_recorder();
        }
    }

    /// Disposes a drained recorder. Its events are relayed until this
    /// returns.
    fn dispose_recorder(&self, generation: u64, recorder: &B::Recorder) {
        if let Err(e) = recorder.dispose() {
            self.report("recorder dispose failed", &e);
        }
        self.recorder.lock().drained(generation);
    }

    // -- Monitor ------------------------------------------------------------

    fn start_monitor(self: &Arc<Self>) {
        if self.is_disposed() {
            tracing::debug!(room_id = %self.id, "room disposed, monitor not started");
            return;
        }
        let old = self.monitor.lock().take();
        if let Some(old) = old {
            self.dispose_monitor(&old);
        }

        let generation = self.monitor.lock().reserve();
        let timing = self.state.lock().settings.monitor_timing();
        let listener: std::sync::Weak<dyn MonitorListener> = Arc::downgrade(self) as _;
        let ctx = MonitorContext {
            room_id: self.id,
            timing,
            events: MonitorEvents::new(listener, generation),
            runtime: self.runtime.clone(),
        };
        let monitor = match self.backend.create_monitor(ctx) {
            Ok(monitor) => Arc::new(monitor),
            Err(e) => {
                self.report("monitor construction failed", &e);
                return;
            }
        };

        let displaced = self.monitor.lock().install(generation, Arc::clone(&monitor));
        if let Some(displaced) = displaced {
            self.dispose_monitor(&displaced);
        }

        if let Err(e) = monitor.start() {
            self.report("monitor start failed", &e);
        }
        let wanted = self.state.lock().settings.wants_monitor();
        if !wanted {
            if let Err(e) = monitor.stop() {
                self.report("monitor stop failed", &e);
            }
        }
        tracing::debug!(room_id = %self.id, generation, active = wanted, "monitor started");
    }

    fn stop_monitor(&self) {
        let taken = self.monitor.lock().take();
        if let Some(monitor) = taken {
            self.dispose_monitor(&monitor);
            tracing::debug!(room_id = %self.id, "monitor stopped");
        }
    }

    fn ensure_monitor_started(self: &Arc<Self>) {
        let current = self.monitor.lock().get();
        match current {
            Some(monitor) => {
                if let Err(e) = monitor.start() {
                    self.report("monitor start failed", &e);
                }
            }
            None => self.start_monitor(),
        }
    }

    fn pause_monitor(&self) {
        let current = self.monitor.lock().get();
        if let Some(monitor) = current {
            if let Err(e) = monitor.stop() {
                self.report("monitor stop failed", &e);
            }
        }
    }

    fn dispose_monitor(&self, monitor: &B::Monitor) {
        if let Err(e) = monitor.dispose() {
            self.report("monitor dispose failed", &e);
        }
    }

    fn monitor_is_current(&self, generation: u64) -> bool {
        let current = self.monitor.lock().is_current(generation);
        if !current {
            tracing::trace!(room_id = %self.id, generation, "dropping event from stale monitor");
        }
        current
    }

    fn recorder_is_current(&self, generation: u64) -> bool {
        let current = self.recorder.lock().accepts(generation);
        if !current {
            tracing::trace!(room_id = %self.id, generation, "dropping event from stale recorder");
        }
        current
    }
}

// ---------------------------------------------------------------------------
// Collaborator event wiring
// ---------------------------------------------------------------------------

impl<B: Backend> MonitorListener for Shared<B> {
    fn on_room_info(self: Arc<Self>, generation: u64, info: RoomInfo) {
        if self.monitor_is_current(generation) {
            self.apply_info(info);
        }
    }

    fn on_stream_status(self: Arc<Self>, generation: u64, is_live: bool) {
        if self.monitor_is_current(generation) {
            self.mutate(|c| {
                replace(&mut c.is_live, is_live).map(|(old, new)| FieldChange::Live { old, new })
            });
        }
    }

    fn on_monitor_log(self: Arc<Self>, generation: u64, message: String) {
        if self.monitor_is_current(generation) {
            self.log(message);
        }
    }
}

impl<B: Backend> RecorderListener for Shared<B> {
    fn on_recorder_log(self: Arc<Self>, generation: u64, message: String) {
        if self.recorder_is_current(generation) {
            self.log(message);
        }
    }

    fn on_record_completed(self: Arc<Self>, generation: u64, segment: RecordedSegment) {
        if self.recorder_is_current(generation) {
            tracing::info!(room_id = %self.id, %segment, "segment completed");
            self.emit(RoomEvent::RecordCompleted {
                room_id: self.id,
                segment,
            });
        }
    }

    fn on_recorder_finished(self: Arc<Self>, generation: u64) {
        let (finished, stopping) = {
            let mut state = self.state.lock();
            let finished = self.recorder.lock().drain_if(generation);
            let stopping =
                finished.is_some() && self.advance(&mut state, RecordingStatus::Stopping);
            (finished, stopping)
        };
        let Some(recorder) = finished else {
            return;
        };
        tracing::info!(room_id = %self.id, "recorder finished");
        if stopping {
            self.announce(RecordingStatus::Stopping);
        }
        self.finish_stop(generation, &recorder);
    }
}
