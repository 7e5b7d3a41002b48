//! Identifier newtypes and the persisted player record.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Rejects identifiers that carry no characters a client could have meant.
fn validate(kind: &'static str, value: &str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::InvalidId(kind, "must not be empty".into()));
    }
    Ok(())
}

/// Identifies a room: a named group of players.
///
/// Rooms are named by clients (`"lobby1"`), so the id is a string. The
/// only guarantee this type gives is that it is non-empty; storage
/// backends may impose stricter rules of their own.
///
/// Serialized as the bare string. Deserializing an empty string fails,
/// so a record read back from storage always carries a usable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a room id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidId`] if `value` is empty or
    /// whitespace only.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        validate("room_id", value)?;
        Ok(Self(value.to_owned()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate("room_id", &value)?;
        Ok(Self(value))
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a player within a room.
///
/// Same rules as [`RoomId`]. A player id is only unique per room: the
/// same `"alice"` may be present in two rooms as two separate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Validates and wraps a player id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidId`] if `value` is empty or
    /// whitespace only.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        validate("player_id", value)?;
        Ok(Self(value.to_owned()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate("player_id", &value)?;
        Ok(Self(value))
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// What a record currently holds besides its identity.
///
/// A record starts out with a status and switches to a client payload on
/// the first explicit "set". The two never coexist: setting data drops
/// the status, and setting data again replaces the previous payload
/// wholesale.
///
/// Flattened into [`PlayerRecord`], so the JSON is either
/// `{"player_id": .., "room_id": .., "status": "active"}` or
/// `{"player_id": .., "room_id": .., "data": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerState {
    /// Free-form state, `"active"` for records created by the server.
    Status { status: String },

    /// Opaque payload supplied by the client.
    Data { data: Value },
}

/// The persisted record of one player in one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub room_id: RoomId,
    #[serde(flatten)]
    pub state: PlayerState,
}

impl PlayerRecord {
    /// Builds the record written on first heartbeat or explicit creation.
    pub fn active(room_id: RoomId, player_id: PlayerId, status: &str) -> Self {
        Self {
            player_id,
            room_id,
            state: PlayerState::Status {
                status: status.to_owned(),
            },
        }
    }

    /// Returns this record with its state replaced by `data`.
    pub fn with_data(self, data: Value) -> Self {
        Self {
            state: PlayerState::Data { data },
            ..self
        }
    }

    /// The status, if the record has not been overwritten by data yet.
    pub fn status(&self) -> Option<&str> {
        match &self.state {
            PlayerState::Status { status } => Some(status),
            PlayerState::Data { .. } => None,
        }
    }

    /// The client payload, if one has been set.
    pub fn data(&self) -> Option<&Value> {
        match &self.state {
            PlayerState::Status { .. } => None,
            PlayerState::Data { data } => Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> PlayerRecord {
        PlayerRecord::active(
            RoomId::parse("lobby1").unwrap(),
            PlayerId::parse("alice").unwrap(),
            "active",
        )
    }

    #[test]
    fn test_room_id_parse_rejects_empty() {
        assert!(matches!(
            RoomId::parse(""),
            Err(ProtocolError::InvalidId("room_id", _))
        ));
        assert!(RoomId::parse("   ").is_err());
    }

    #[test]
    fn test_player_id_parse_accepts_plain_name() {
        let id = PlayerId::parse("alice").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn test_player_id_deserialize_empty_string_fails() {
        let result: Result<PlayerId, _> = serde_json::from_str(r#""""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_active_record_json_shape() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(
            value,
            json!({"player_id": "alice", "room_id": "lobby1", "status": "active"})
        );
    }

    #[test]
    fn test_with_data_replaces_status() {
        let updated = record().with_data(json!({"x": 1}));

        assert_eq!(updated.status(), None);
        assert_eq!(updated.data(), Some(&json!({"x": 1})));
        assert_eq!(
            serde_json::to_value(&updated).unwrap(),
            json!({"player_id": "alice", "room_id": "lobby1", "data": {"x": 1}})
        );
    }

    #[test]
    fn test_record_deserializes_both_shapes() {
        let with_status: PlayerRecord = serde_json::from_str(
            r#"{"player_id":"bob","room_id":"r","status":"idle"}"#,
        )
        .unwrap();
        assert_eq!(with_status.status(), Some("idle"));

        let with_data: PlayerRecord = serde_json::from_str(
            r#"{"player_id":"bob","room_id":"r","data":[1,2,3]}"#,
        )
        .unwrap();
        assert_eq!(with_data.data(), Some(&json!([1, 2, 3])));
    }
}
