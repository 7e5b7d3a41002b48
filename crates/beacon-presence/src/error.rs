//! Error types for the presence layer.

use beacon_protocol::{PlayerId, ProtocolError, RoomId};
use beacon_store::StoreError;

/// Outcome of a failed [`PresenceService`](crate::PresenceService) call.
///
/// No variant leaves partial state behind: each operation runs entirely
/// under the coordination lock and fails before mutating anything, or
/// after its mutation is complete.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// A required identifier was missing, empty, or unusable by the
    /// store. The caller can retry with valid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No record exists for this player in this room.
    #[error("player {player_id} not found in room {room_id}")]
    PlayerNotFound { room_id: RoomId, player_id: PlayerId },

    /// The room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The underlying storage failed.
    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    /// The blocking task running the store access panicked or was
    /// cancelled by runtime shutdown.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PresenceError {
    /// HTTP-style status code for this error: 400, 404, or 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::PlayerNotFound { .. } | Self::RoomNotFound(_) => 404,
            Self::Store(_) | Self::Task(_) => 500,
        }
    }

    /// Short client-facing message, without internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid data",
            Self::PlayerNotFound { .. } => "Player not found",
            Self::RoomNotFound(_) => "Room not found",
            Self::Store(_) | Self::Task(_) => "Storage failure",
        }
    }
}

impl From<StoreError> for PresenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlayerNotFound(room_id, player_id) => {
                Self::PlayerNotFound { room_id, player_id }
            }
            StoreError::RoomNotFound(room_id) => Self::RoomNotFound(room_id),
            StoreError::InvalidKey(..) => Self::InvalidInput(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<ProtocolError> for PresenceError {
    fn from(err: ProtocolError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
