//! Error types for the storage layer.

use beacon_protocol::{PlayerId, ProtocolError, RoomId};

/// Errors returned by [`RecordStore`](crate::RecordStore) and
/// [`RoomDirectory`](crate::RoomDirectory) implementations.
///
/// The two `NotFound` variants are ordinary outcomes the caller is
/// expected to handle. Everything else is a backend failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for this player in this room.
    #[error("player {1} not found in room {0}")]
    PlayerNotFound(RoomId, PlayerId),

    /// The room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The backend cannot address this id (e.g. a path separator in a
    /// file-backed store).
    #[error("invalid key {0:?}: {1}")]
    InvalidKey(String, &'static str),

    /// A stored record could not be decoded.
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: ProtocolError,
    },

    /// A record could not be encoded for writing.
    #[error("encode failed: {0}")]
    Encode(#[source] ProtocolError),

    /// The underlying I/O failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for the `PlayerNotFound` / `RoomNotFound` outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PlayerNotFound(..) | Self::RoomNotFound(_))
    }
}
