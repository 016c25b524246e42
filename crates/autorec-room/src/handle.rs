//! Collaborator contracts: the monitor, the recorder, and the backend
//! that builds them.
//!
//! These are the extension points for embedding applications. The room
//! calls them at the right moments; implementors only talk to the
//! platform and the stream server.

use std::future::Future;

use autorec_model::{MonitorTiming, RecorderTiming, RoomId};
use tokio::runtime::Handle;

use crate::{HandleError, MonitorEvents, RecorderEvents};

/// Watches a room on the platform and reports what it sees through the
/// [`MonitorEvents`] it was constructed with.
///
/// All methods are synchronous and cheap. Long-running work belongs in a
/// task the monitor spawns itself (see [`PollingMonitor`](crate::PollingMonitor)).
pub trait MonitorHandle: Send + Sync + 'static {
    /// Begins (or resumes) watching.
    fn start(&self) -> Result<(), HandleError>;

    /// Pauses watching. The monitor stays usable.
    fn stop(&self) -> Result<(), HandleError>;

    /// Picks up new polling/retry timing without a restart.
    fn apply_setting_change(&self, timing: MonitorTiming) -> Result<(), HandleError>;

    /// Releases everything. Events emitted after this are ignored by the
    /// room regardless.
    fn dispose(&self) -> Result<(), HandleError>;
}

/// Captures the live stream to disk.
pub trait RecorderHandle: Send + Sync + 'static {
    /// Connects and begins capture. Resolves once capture actually
    /// started, or with the reason it could not.
    fn start(&self) -> impl Future<Output = Result<(), HandleError>> + Send;

    /// Stops capture and releases resources.
    fn dispose(&self) -> Result<(), HandleError>;
}

/// What a new monitor needs to know.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub room_id: RoomId,
    pub timing: MonitorTiming,
    pub events: MonitorEvents,
    /// Runtime the room lives on, for monitors that spawn work.
    pub runtime: Handle,
}

/// What a new recorder needs to know. Captured at construction time.
#[derive(Debug, Clone)]
pub struct RecorderContext {
    pub room_id: RoomId,
    pub user_name: String,
    pub title: String,
    pub timing: RecorderTiming,
    pub events: RecorderEvents,
    pub runtime: Handle,
}

/// Builds monitors and recorders for rooms.
///
/// One backend is shared by every room in a [`RoomManager`](crate::RoomManager).
///
/// ```ignore
/// struct MyBackend { client: HttpClient }
///
/// impl Backend for MyBackend {
///     type Monitor = PollingMonitor<HttpStatusSource>;
///     type Recorder = FlvRecorder;
///
///     fn create_monitor(&self, ctx: MonitorContext) -> Result<Self::Monitor, HandleError> {
///         Ok(PollingMonitor::new(self.status_source(), ctx))
///     }
///
///     fn create_recorder(&self, ctx: RecorderContext) -> Result<Self::Recorder, HandleError> {
///         FlvRecorder::new(&self.client, ctx)
///     }
/// }
/// ```
pub trait Backend: Send + Sync + 'static {
    type Monitor: MonitorHandle;
    type Recorder: RecorderHandle;

    /// Creates a monitor. Must not emit events before it is started.
    fn create_monitor(&self, ctx: MonitorContext) -> Result<Self::Monitor, HandleError>;

    /// Creates a recorder. Must not begin capture before `start` is called.
    fn create_recorder(&self, ctx: RecorderContext) -> Result<Self::Recorder, HandleError>;
}
