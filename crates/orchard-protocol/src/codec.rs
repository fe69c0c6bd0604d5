//! Codec trait and the JSON implementation.
//!
//! The substrate never serializes frames by hand: it holds something that
//! implements [`Codec`] and calls `encode`/`decode`. Swapping JSON for a
//! binary format later means adding one more implementation here.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts frames to bytes and back.
///
/// `Send + Sync + 'static` because the codec lives in state shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Browser clients already speak JSON, and frames stay readable in
/// DevTools.
///
/// ```rust
/// use orchard_protocol::{ClientFrame, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame: ClientFrame = codec
///     .decode(br#"{"type":"move","data":{"x":1,"z":2}}"#)
///     .unwrap();
/// assert_eq!(frame.tag, "move");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
