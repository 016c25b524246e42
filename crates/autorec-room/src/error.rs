//! Error types for the room layer.

use autorec_model::{ModelError, RoomId};

/// Errors returned by room and room-list operations.
///
/// Collaborator failures are not in here: those are caught at the
/// orchestration boundary and turned into log events.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room is not in the room list.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A room with this id is already in the room list.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The settings or descriptor cannot describe a real room.
    #[error("invalid room: {0}")]
    Invalid(#[from] ModelError),

    /// Rooms spawn recorder starts onto a Tokio runtime; none was running
    /// on the constructing thread.
    #[error("rooms must be created inside a Tokio runtime")]
    NoRuntime,
}

/// Errors a monitor or recorder reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// Connecting to the platform or stream server failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The handle was already disposed.
    #[error("handle already disposed")]
    Disposed,

    /// Anything else the collaborator wants to surface.
    #[error("{0}")]
    Other(String),
}
