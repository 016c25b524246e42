//! Error types for the settings layer.

use autorec_model::ModelError;

/// Errors that can occur while loading or saving settings.
///
/// None of these ever block a room's state transitions: the store logs
/// save failures and keeps the document dirty so the next change retries.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the backing file failed.
    #[error("settings i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] ModelError),

    /// The store task is gone (shut down, or every handle was dropped).
    #[error("settings store is closed")]
    Closed,
}
