//! Unified error type for autorec.

use autorec_model::ModelError;
use autorec_room::RoomError;
use autorec_settings::SettingsError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AutorecError {
    /// Encoding or validating a room's data failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Loading or saving settings failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A room-list operation failed (duplicate, not found, invalid).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Waiting for the shutdown signal failed.
    #[error("signal handling failed: {0}")]
    Signal(#[from] std::io::Error),
}
