//! Codec trait and implementations for settings documents.
//!
//! The settings store does not care how a document becomes bytes; it
//! holds something implementing [`Codec`]. [`JsonCodec`] is the default
//! because the settings file is meant to be edited by hand.

use serde::{Serialize, de::DeserializeOwned};

use crate::ModelError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the settings
/// flush task for the whole life of the process.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ModelError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ModelError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ModelError::Decode`] if the bytes are malformed or do not
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ModelError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] producing pretty-printed JSON.
///
/// ## Example
///
/// ```rust
/// use autorec_model::{Codec, JsonCodec, RoomId, RoomSettings};
///
/// let codec = JsonCodec;
/// let settings = RoomSettings::new(RoomId(21452505));
///
/// let bytes = codec.encode(&settings).unwrap();
/// let decoded: RoomSettings = codec.decode(&bytes).unwrap();
/// assert_eq!(settings, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec_pretty(value).map_err(ModelError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ModelError> {
        serde_json::from_slice(data).map_err(ModelError::Decode)
    }
}
