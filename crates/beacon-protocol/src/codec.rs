//! Codec trait and the JSON implementation.
//!
//! The same codec serves two masters: the request handler uses it for
//! wire messages, and the file store uses it for persisted records. Both
//! only need "value to bytes" and "bytes to value", so one trait covers
//! both.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec is shared by every connection
/// task and lives as long as the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps both the wire format and the record files readable with
/// nothing more than a text editor or browser DevTools.
///
/// ```rust
/// use beacon_protocol::{Codec, JsonCodec, PlayerId, PlayerRecord, RoomId};
///
/// let codec = JsonCodec;
/// let record = PlayerRecord::active(
///     RoomId::parse("lobby1").unwrap(),
///     PlayerId::parse("alice").unwrap(),
///     "active",
/// );
///
/// let bytes = codec.encode(&record).unwrap();
/// let decoded: PlayerRecord = codec.decode(&bytes).unwrap();
/// assert_eq!(record, decoded);
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
