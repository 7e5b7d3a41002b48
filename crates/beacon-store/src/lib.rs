//! Persistent player records and the room directory.
//!
//! Two traits describe what the presence layer needs from storage:
//!
//! - [`RecordStore`]: one record per `(room, player)`, last write wins.
//! - [`RoomDirectory`]: which rooms exist; a room lives while it holds
//!   records or was created explicitly.
//!
//! Both are implemented by every backend, because in any real layout the
//! room directory *is* the record store viewed one level up:
//!
//! - [`MemoryStore`]: ordered maps, for tests and ephemeral servers.
//! - [`FileStore`]: `<data_dir>/<room>/<player>.json` on disk.
//!
//! # Concurrency
//!
//! Nothing here locks. Backends take `&mut self` for mutations and are
//! owned by the presence service, which serializes every access under its
//! own coordination lock together with the liveness registry.

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use beacon_protocol::{PlayerId, PlayerRecord, RoomId};
use serde_json::Value;

/// Durable storage of player records keyed by `(room, player)`.
pub trait RecordStore: Send + Sync + 'static {
    /// Writes a fresh record with `status` unless one already exists.
    ///
    /// Returns `true` if the record was created. An existing record is
    /// left untouched, including any data set on it.
    fn create_if_absent(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        status: &str,
    ) -> Result<bool, StoreError>;

    /// Reads one record.
    ///
    /// # Errors
    /// [`StoreError::PlayerNotFound`] if there is no such record.
    fn get(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<PlayerRecord, StoreError>;

    /// Replaces an existing record's state with `data`. Never creates.
    ///
    /// # Errors
    /// [`StoreError::PlayerNotFound`] if there is no such record.
    fn set(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        data: Value,
    ) -> Result<(), StoreError>;

    /// Deletes one record. The room is left in place even if now empty;
    /// see [`RoomDirectory::remove_if_empty`].
    ///
    /// # Errors
    /// [`StoreError::PlayerNotFound`] if there is no such record.
    fn delete(&mut self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError>;

    /// All records in a room, ordered by player id.
    ///
    /// # Errors
    /// [`StoreError::RoomNotFound`] if the room does not exist. An
    /// existing room with no records yields an empty list.
    fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<PlayerRecord>, StoreError>;

    /// Storage keys of a room's records (`<player>.json`), sorted.
    ///
    /// # Errors
    /// [`StoreError::RoomNotFound`] if the room does not exist.
    fn list_keys(&self, room_id: &RoomId) -> Result<Vec<String>, StoreError>;

    /// Checks that this backend can address `(room, player)` without
    /// touching storage.
    ///
    /// # Errors
    /// [`StoreError::InvalidKey`] if either id is unusable here.
    fn check_key(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError> {
        let _ = (room_id, player_id);
        Ok(())
    }
}

/// Tracks which rooms exist.
pub trait RoomDirectory: Send + Sync + 'static {
    /// Creates the room if absent. Idempotent.
    fn ensure(&mut self, room_id: &RoomId) -> Result<(), StoreError>;

    /// Whether the room currently exists.
    fn exists(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// Removes the room if it holds no records.
    ///
    /// Returns `true` if the room was removed. A missing room or a room
    /// that still has records yields `false`.
    fn remove_if_empty(&mut self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// Every existing room, sorted.
    fn rooms(&self) -> Result<Vec<RoomId>, StoreError>;
}

/// Storage key of a player's record within its room.
pub fn record_key(player_id: &PlayerId) -> String {
    format!("{player_id}.json")
}
