//! A ready-made monitor that polls a [`StatusSource`] on a schedule.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use autorec_model::{MonitorTiming, RoomId, RoomInfo};
use autorec_poll::{PollConfig, PollScheduler};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{HandleError, MonitorContext, MonitorEvents, MonitorHandle};

/// What one status check of a room returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub info: RoomInfo,
    pub is_live: bool,
}

/// Fetches the current status of a room from the platform.
pub trait StatusSource: Send + Sync + 'static {
    fn fetch(&self, room_id: RoomId) -> impl Future<Output = Result<RoomStatus, HandleError>> + Send;
}

#[derive(Debug, Clone, Copy)]
struct PollControl {
    running: bool,
    timing: MonitorTiming,
}

/// Polls a [`StatusSource`] every `check_interval`, retrying after
/// `danmaku_retry` when a fetch fails.
///
/// The poll task is spawned on the first `start` and lives until
/// `dispose`. `stop` and `start` pause and resume it; timing changes are
/// picked up by the running task without a restart.
pub struct PollingMonitor<S: StatusSource> {
    room_id: RoomId,
    source: Arc<S>,
    events: MonitorEvents,
    runtime: Handle,
    control: watch::Sender<PollControl>,
    task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
    jitter: Duration,
}

impl<S: StatusSource> PollingMonitor<S> {
    pub fn new(source: Arc<S>, ctx: MonitorContext) -> Self {
        let (control, _) = watch::channel(PollControl {
            running: false,
            timing: ctx.timing,
        });
        Self {
            room_id: ctx.room_id,
            source,
            events: ctx.events,
            runtime: ctx.runtime,
            control,
            task: Mutex::new(None),
            disposed: AtomicBool::new(false),
            jitter: PollConfig::default().initial_jitter,
        }
    }

    /// Caps the random delay before the first poll after a (re)start.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.control.borrow().running && !self.disposed.load(Ordering::SeqCst)
    }

    pub fn timing(&self) -> MonitorTiming {
        self.control.borrow().timing
    }
}

impl<S: StatusSource> MonitorHandle for PollingMonitor<S> {
    fn start(&self) -> Result<(), HandleError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(HandleError::Disposed);
        }
        self.control.send_modify(|c| c.running = true);

        let mut task = self.task.lock();
        if task.is_none() {
            let poll = poll_loop(
                Arc::clone(&self.source),
                self.room_id,
                self.events.clone(),
                self.control.subscribe(),
                self.jitter,
            );
            *task = Some(self.runtime.spawn(poll));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), HandleError> {
        self.control.send_modify(|c| c.running = false);
        Ok(())
    }

    fn apply_setting_change(&self, timing: MonitorTiming) -> Result<(), HandleError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(HandleError::Disposed);
        }
        self.control.send_modify(|c| c.timing = timing);
        Ok(())
    }

    fn dispose(&self) -> Result<(), HandleError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.control.send_modify(|c| c.running = false);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        tracing::debug!(room_id = %self.room_id, "monitor disposed");
        Ok(())
    }
}

impl<S: StatusSource> Drop for PollingMonitor<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn poll_loop<S: StatusSource>(
    source: Arc<S>,
    room_id: RoomId,
    events: MonitorEvents,
    mut control: watch::Receiver<PollControl>,
    jitter: Duration,
) {
    let initial = *control.borrow_and_update();
    let mut scheduler = PollScheduler::new(PollConfig {
        interval: initial.timing.check_interval,
        retry_delay: initial.timing.danmaku_retry,
        initial_jitter: jitter,
    });
    if !initial.running {
        scheduler.pause();
    }
    tracing::debug!(%room_id, "poll task started");

    loop {
        tokio::select! {
            changed = control.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *control.borrow_and_update();
                scheduler.set_interval(next.timing.check_interval);
                scheduler.set_retry_delay(next.timing.danmaku_retry);
                if next.running {
                    scheduler.resume();
                } else {
                    scheduler.pause();
                }
            }
            due = scheduler.wait_for_poll() => {
                match source.fetch(room_id).await {
                    Ok(status) => {
                        scheduler.record_success();
                        events.room_info_updated(status.info);
                        events.stream_status_changed(status.is_live);
                    }
                    Err(e) => {
                        scheduler.record_failure();
                        tracing::debug!(%room_id, poll = due.poll, error = %e, "status check failed");
                        events.log(format!("[{room_id}] status check failed: {e}"));
                    }
                }
                if events.is_detached() {
                    break;
                }
            }
        }
    }

    tracing::debug!(%room_id, "poll task stopped");
}
