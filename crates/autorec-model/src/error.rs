//! Error types for the model layer.

/// Errors that can occur while encoding or decoding model data.
///
/// Settings documents are the only thing this crate serializes, so the
/// variants are about codecs. Storage-level failures (missing file,
/// permissions) belong to the settings crate.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed document, wrong field types).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded but violates a model rule, e.g. a room id of 0.
    #[error("invalid value: {0}")]
    Invalid(String),
}
