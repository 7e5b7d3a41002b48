//! Error types for the protocol layer.

/// Errors that can occur while validating identifiers or converting
/// messages and records to and from bytes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An identifier was empty or otherwise unusable.
    ///
    /// The first field names which identifier (`"room_id"`,
    /// `"player_id"`), the second says what was wrong with it.
    #[error("invalid {0}: {1}")]
    InvalidId(&'static str, String),

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or a shape that matches no known message.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
