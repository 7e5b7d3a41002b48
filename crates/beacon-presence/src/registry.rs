//! The liveness registry: who heartbeated, and when.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use beacon_protocol::{PlayerId, RoomId};

/// Identifies one tracked player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenceKey {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

impl PresenceKey {
    pub fn new(room_id: RoomId, player_id: PlayerId) -> Self {
        Self { room_id, player_id }
    }
}

/// In-memory map from `(room, player)` to the instant of the last
/// heartbeat.
///
/// Not persisted and not synchronized: it lives inside the presence
/// service's lock, next to the record store it must agree with. Players
/// that were created without ever heartbeating have no entry here and so
/// never expire.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: HashMap<PresenceKey, Instant>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a heartbeat at `now`, replacing any earlier one.
    pub fn touch(&mut self, room_id: &RoomId, player_id: &PlayerId, now: Instant) {
        self.entries
            .insert(PresenceKey::new(room_id.clone(), player_id.clone()), now);
    }

    /// Removes and returns every entry whose last heartbeat is more than
    /// `timeout` before `now`, sorted by room then player.
    ///
    /// An entry exactly `timeout` old survives.
    pub fn sweep_expired(&mut self, now: Instant, timeout: Duration) -> Vec<PresenceKey> {
        let mut expired = Vec::new();
        self.entries.retain(|key, last_seen| {
            let stale = now.saturating_duration_since(*last_seen) > timeout;
            if stale {
                expired.push(key.clone());
            }
            !stale
        });
        expired.sort();
        expired
    }

    /// Stops tracking a player. Returns `true` if it was tracked.
    pub fn remove(&mut self, room_id: &RoomId, player_id: &PlayerId) -> bool {
        self.entries
            .remove(&PresenceKey::new(room_id.clone(), player_id.clone()))
            .is_some()
    }

    /// When the player last heartbeated, if tracked.
    pub fn last_seen(&self, room_id: &RoomId, player_id: &PlayerId) -> Option<Instant> {
        self.entries
            .get(&PresenceKey::new(room_id.clone(), player_id.clone()))
            .copied()
    }

    /// Number of tracked players.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
