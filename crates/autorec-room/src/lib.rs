//! Per-room orchestration for autorec.
//!
//! A [`Room`] watches one broadcast room and records it while it is live.
//! It owns the room's [`RoomConfig`], reacts to status reports from a
//! monitor, and drives the start/stop lifecycle of a monitor and a
//! recorder supplied by the embedding application through [`Backend`].
//!
//! Every setter on [`Room`] runs the reactive dispatch synchronously on
//! the calling thread: the change is described as a [`FieldChange`],
//! mapped to a list of [`Command`]s by the pure [`plan`] function, and
//! executed in order.
//!
//! # Key types
//!
//! - [`Backend`]: factory for the two collaborators
//! - [`MonitorHandle`] / [`RecorderHandle`]: collaborator contracts
//! - [`Room`]: the orchestrator
//! - [`RoomManager`]: the room list
//! - [`RecordingStatus`]: recorder lifecycle state machine
//! - [`RoomEvent`]: what the room tells the outside world
//! - [`PollingMonitor`]: a ready-made monitor over a [`StatusSource`]

mod config;
mod dispatch;
mod error;
mod events;
mod handle;
mod manager;
mod monitor;
mod room;
mod slot;

pub use config::{RecordingStatus, RoomConfig};
pub use dispatch::{Command, Field, FieldChange, plan};
pub use error::{HandleError, RoomError};
pub use events::{MonitorEvents, RecorderEvents, RoomEvent};
pub use handle::{Backend, MonitorContext, MonitorHandle, RecorderContext, RecorderHandle};
pub use manager::RoomManager;
pub use monitor::{PollingMonitor, RoomStatus, StatusSource};
pub use room::Room;
