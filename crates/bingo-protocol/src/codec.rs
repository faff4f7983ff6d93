//! Codec trait and implementations for serializing/deserializing events.
//!
//! The coordinator never touches JSON directly; it hands events to a
//! [`Codec`]. [`JsonCodec`] is the only implementation today because
//! browsers speak JSON text frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text frames and decodes incoming frames.
///
/// Incoming frames are taken as raw bytes because a client may send either
/// text or binary WebSocket frames carrying the same JSON.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use bingo_protocol::{Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
/// let text = codec.encode(&ServerEvent::NumberDrawn { number: 17 }).unwrap();
/// assert_eq!(text, r#"{"event":"number_drawn","data":{"number":17}}"#);
///
/// let decoded: ServerEvent = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(decoded, ServerEvent::NumberDrawn { number: 17 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
