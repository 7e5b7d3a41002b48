//! Request and reply envelopes exchanged with clients.
//!
//! Every frame a client sends is one [`Request`]; every frame the server
//! sends back is one [`Reply`] carrying the same `seq`, so a client can
//! pipeline requests and match answers without waiting.
//!
//! ```text
//! → {"seq":7,"op":{"type":"Heartbeat","room_id":"lobby1","player_id":"alice"}}
//! ← {"seq":7,"code":200,"body":{"type":"Ack","message":"Heartbeat received"}}
//! ```
//!
//! Identifier fields are plain strings here, not [`RoomId`]/[`PlayerId`]:
//! a missing or empty id must reach the presence layer so it can be
//! rejected as invalid input (code 400) rather than failing to decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PlayerRecord, RoomId};

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Client-chosen correlation number, echoed in the reply.
    #[serde(default)]
    pub seq: u64,

    /// What the client wants done.
    pub op: Operation,
}

/// The operations a client can request.
///
/// Internally tagged: `{"type": "GetPlayer", "room_id": .., "player_id": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// "I'm still here." Creates the room and record on first use.
    Heartbeat {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        player_id: String,
    },

    /// Creates a player record without starting liveness tracking.
    CreatePlayer {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        player_id: String,
    },

    /// Fetches one player record.
    GetPlayer {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        player_id: String,
    },

    /// Replaces a player's state with an opaque payload.
    ///
    /// `data` is optional on the wire only so that a missing payload can
    /// be reported as invalid input instead of a decode failure.
    SetPlayerData {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        player_id: String,
        #[serde(default)]
        data: Option<Value>,
    },

    /// Removes a player record and its liveness entry.
    DeletePlayer {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        player_id: String,
    },

    /// Creates an empty room.
    CreateRoom {
        #[serde(default)]
        room_id: String,
    },

    /// Lists every record in a room.
    ListRoomPlayers {
        #[serde(default)]
        room_id: String,
    },

    /// Lists every room that currently exists.
    ListRooms,

    /// Lists the storage keys (record file names) of a room.
    ListRoomFiles {
        #[serde(default)]
        room_id: String,
    },
}

impl Operation {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heartbeat { .. } => "Heartbeat",
            Self::CreatePlayer { .. } => "CreatePlayer",
            Self::GetPlayer { .. } => "GetPlayer",
            Self::SetPlayerData { .. } => "SetPlayerData",
            Self::DeletePlayer { .. } => "DeletePlayer",
            Self::CreateRoom { .. } => "CreateRoom",
            Self::ListRoomPlayers { .. } => "ListRoomPlayers",
            Self::ListRooms => "ListRooms",
            Self::ListRoomFiles { .. } => "ListRoomFiles",
        }
    }
}

/// The server's answer to one [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// The `seq` of the request being answered (0 if it couldn't be read).
    pub seq: u64,

    /// HTTP-style outcome: 200 success, 400 invalid input, 404 not found,
    /// 500 storage failure.
    pub code: u16,

    pub body: ReplyBody,
}

impl Reply {
    /// A 200 reply with a body.
    pub fn ok(seq: u64, body: ReplyBody) -> Self {
        Self {
            seq,
            code: 200,
            body,
        }
    }

    /// A 200 reply carrying only a confirmation message.
    pub fn ack(seq: u64, message: &str) -> Self {
        Self::ok(
            seq,
            ReplyBody::Ack {
                message: message.to_owned(),
            },
        )
    }

    /// A failure reply.
    pub fn error(seq: u64, code: u16, message: impl Into<String>) -> Self {
        Self {
            seq,
            code,
            body: ReplyBody::Error {
                message: message.into(),
            },
        }
    }

    /// Returns `true` for a 2xx code.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Payload of a [`Reply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplyBody {
    Ack { message: String },
    Player { player: PlayerRecord },
    Players { players: Vec<PlayerRecord> },
    Rooms { rooms: Vec<RoomId> },
    Files { files: Vec<String> },
    Error { message: String },
}
