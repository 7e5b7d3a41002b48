//! In-memory backend.

use std::collections::BTreeMap;

use beacon_protocol::{PlayerId, PlayerRecord, PlayerState, RoomId};
use serde_json::Value;

use crate::{RecordStore, RoomDirectory, StoreError, record_key};

/// Records held in ordered maps: room → player → record.
///
/// A room with an empty inner map is an explicitly created room that
/// nobody has joined yet.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: BTreeMap<RoomId, BTreeMap<PlayerId, PlayerRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all rooms.
    pub fn record_count(&self) -> usize {
        self.rooms.values().map(BTreeMap::len).sum()
    }

    fn room(&self, room_id: &RoomId) -> Result<&BTreeMap<PlayerId, PlayerRecord>, StoreError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))
    }
}

impl RecordStore for MemoryStore {
    fn create_if_absent(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        status: &str,
    ) -> Result<bool, StoreError> {
        let players = self.rooms.entry(room_id.clone()).or_default();
        if players.contains_key(player_id) {
            return Ok(false);
        }
        players.insert(
            player_id.clone(),
            PlayerRecord::active(room_id.clone(), player_id.clone(), status),
        );
        Ok(true)
    }

    fn get(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<PlayerRecord, StoreError> {
        self.rooms
            .get(room_id)
            .and_then(|players| players.get(player_id))
            .cloned()
            .ok_or_else(|| StoreError::PlayerNotFound(room_id.clone(), player_id.clone()))
    }

    fn set(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        data: Value,
    ) -> Result<(), StoreError> {
        let record = self
            .rooms
            .get_mut(room_id)
            .and_then(|players| players.get_mut(player_id))
            .ok_or_else(|| StoreError::PlayerNotFound(room_id.clone(), player_id.clone()))?;
        record.state = PlayerState::Data { data };
        Ok(())
    }

    fn delete(&mut self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError> {
        self.rooms
            .get_mut(room_id)
            .and_then(|players| players.remove(player_id))
            .map(|_| ())
            .ok_or_else(|| StoreError::PlayerNotFound(room_id.clone(), player_id.clone()))
    }

    fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<PlayerRecord>, StoreError> {
        Ok(self.room(room_id)?.values().cloned().collect())
    }

    fn list_keys(&self, room_id: &RoomId) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.room(room_id)?.keys().map(record_key).collect();
        // `{player}.json` sorts differently from `{player}` when one id
        // is a prefix of another.
        keys.sort();
        Ok(keys)
    }
}

impl RoomDirectory for MemoryStore {
    fn ensure(&mut self, room_id: &RoomId) -> Result<(), StoreError> {
        if !self.rooms.contains_key(room_id) {
            self.rooms.insert(room_id.clone(), BTreeMap::new());
            tracing::debug!(%room_id, "room created");
        }
        Ok(())
    }

    fn exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        Ok(self.rooms.contains_key(room_id))
    }

    fn remove_if_empty(&mut self, room_id: &RoomId) -> Result<bool, StoreError> {
        match self.rooms.get(room_id) {
            Some(players) if players.is_empty() => {
                self.rooms.remove(room_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn rooms(&self) -> Result<Vec<RoomId>, StoreError> {
        Ok(self.rooms.keys().cloned().collect())
    }
}
