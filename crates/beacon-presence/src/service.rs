//! The presence service: every public operation over the registry, the
//! record store, and the room directory.
//!
//! # Consistency
//!
//! All three live inside one `RwLock`. Mutations and reaper cycles take
//! the write half for their full duration; reads (`get_player`, listings)
//! take the read half and so see a consistent snapshot. Under the lock
//! the following always hold:
//!
//! - every registry entry has a persisted record behind it;
//! - a room is removed as soon as a deletion or eviction leaves it
//!   without records.
//!
//! The clock is read only while holding the write lock, so heartbeats and
//! sweeps are totally ordered: a heartbeat that got the lock first is
//! seen by the next sweep, and a sweep that got it first has finished
//! before the heartbeat re-creates what it removed.
//!
//! # Blocking
//!
//! Store backends are synchronous and may hit the disk. Every store
//! access runs on tokio's blocking pool, holding an owned lock guard, so
//! connection tasks on the async workers never wait on file I/O.

use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_protocol::{PlayerId, PlayerRecord, RoomId};
use beacon_store::{RecordStore, RoomDirectory, StoreError};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task;

use crate::{Clock, PresenceConfig, PresenceError, PresenceKey, PresenceRegistry, TokioClock};

/// Everything the coordination lock guards.
struct PresenceState<S> {
    registry: PresenceRegistry,
    store: S,
}

/// What one reaper cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Players whose heartbeat timed out, sorted.
    pub evicted: Vec<PresenceKey>,
    /// Rooms removed because they were left without records.
    pub rooms_removed: Vec<RoomId>,
    /// Store failures that were logged and skipped.
    pub failures: usize,
}

impl ReapReport {
    /// Returns `true` if the cycle changed nothing and hit no failures.
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.rooms_removed.is_empty() && self.failures == 0
    }
}

/// Presence operations over a store `S`, timed by clock `C`.
///
/// Share it with `Arc`; every method takes `&self`.
pub struct PresenceService<S, C = TokioClock> {
    state: Arc<RwLock<PresenceState<S>>>,
    clock: C,
    config: PresenceConfig,
}

impl<S> PresenceService<S, TokioClock>
where
    S: RecordStore + RoomDirectory,
{
    /// Creates a service on tokio's clock.
    pub fn new(store: S, config: PresenceConfig) -> Self {
        Self::with_clock(store, config, TokioClock)
    }
}

impl<S, C> PresenceService<S, C>
where
    S: RecordStore + RoomDirectory,
    C: Clock,
{
    /// Creates a service with an explicit clock.
    pub fn with_clock(store: S, config: PresenceConfig, clock: C) -> Self {
        Self {
            state: Arc::new(RwLock::new(PresenceState {
                registry: PresenceRegistry::new(),
                store,
            })),
            clock,
            config: config.validated(),
        }
    }

    /// The (validated) configuration in effect.
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// The clock this service reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs `f` on the blocking pool under the write lock. `now` is read
    /// after the lock is taken.
    async fn write<T, F>(&self, f: F) -> Result<T, PresenceError>
    where
        F: FnOnce(&mut PresenceState<S>, Instant) -> Result<T, PresenceError> + Send + 'static,
        T: Send + 'static,
    {
        let mut state = Arc::clone(&self.state).write_owned().await;
        let now = self.clock.now();
        task::spawn_blocking(move || f(&mut *state, now)).await?
    }

    /// Runs `f` on the blocking pool under the read lock.
    async fn read<T, F>(&self, f: F) -> Result<T, PresenceError>
    where
        F: FnOnce(&PresenceState<S>) -> Result<T, PresenceError> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state).read_owned().await;
        task::spawn_blocking(move || f(&*state)).await?
    }

    // -----------------------------------------------------------------
    // Mutations (write lock)
    // -----------------------------------------------------------------

    /// Records a heartbeat, creating the room and the player record on
    /// first contact. Safe to repeat.
    ///
    /// # Errors
    /// [`PresenceError::InvalidInput`] for an empty id, or one the store
    /// cannot address. Nothing is created in that case.
    pub async fn heartbeat(&self, room_id: &str, player_id: &str) -> Result<(), PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;
        let status = self.config.default_status.clone();

        self.write(move |state, now| {
            if join_room(&mut state.store, &room_id, &player_id, &status)? {
                tracing::info!(%room_id, %player_id, "player joined by heartbeat");
            }
            state.registry.touch(&room_id, &player_id, now);
            tracing::trace!(%room_id, %player_id, "heartbeat");
            Ok(())
        })
        .await
    }

    /// Creates a player record without tracking liveness; such a player
    /// never times out. An existing record is left untouched.
    ///
    /// Returns `true` if the record was newly created.
    ///
    /// # Errors
    /// [`PresenceError::InvalidInput`] for an empty id.
    pub async fn create_player(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<bool, PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;
        let status = self.config.default_status.clone();

        self.write(move |state, _| {
            let created = join_room(&mut state.store, &room_id, &player_id, &status)?;
            if created {
                tracing::info!(%room_id, %player_id, "player created");
            }
            Ok(created)
        })
        .await
    }

    /// Replaces a player's state with `data`. Never creates a player.
    ///
    /// # Errors
    /// [`PresenceError::PlayerNotFound`] if the player does not exist.
    pub async fn set_player_data(
        &self,
        room_id: &str,
        player_id: &str,
        data: Value,
    ) -> Result<(), PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;

        self.write(move |state, _| {
            state.store.set(&room_id, &player_id, data)?;
            tracing::debug!(%room_id, %player_id, "player data updated");
            Ok(())
        })
        .await
    }

    /// Deletes a player's record and liveness entry, then removes the
    /// room if that was its last player.
    ///
    /// # Errors
    /// [`PresenceError::PlayerNotFound`] if the player does not exist.
    pub async fn delete_player(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(), PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;

        self.write(move |state, _| {
            match state.store.delete(&room_id, &player_id) {
                Ok(()) => {}
                Err(StoreError::PlayerNotFound(..)) => {
                    state.registry.remove(&room_id, &player_id);
                    return Err(PresenceError::PlayerNotFound { room_id, player_id });
                }
                Err(e) => return Err(e.into()),
            }
            state.registry.remove(&room_id, &player_id);
            tracing::info!(%room_id, %player_id, "player deleted");

            // The deletion already happened; a room left behind here is
            // picked up by the reaper's empty-room scan.
            match state.store.remove_if_empty(&room_id) {
                Ok(true) => tracing::info!(%room_id, "room removed (last player deleted)"),
                Ok(false) => {}
                Err(e) => tracing::warn!(%room_id, error = %e, "failed to remove empty room"),
            }
            Ok(())
        })
        .await
    }

    /// Creates an empty room. Idempotent.
    ///
    /// An empty room is removed again by the reaper's next empty-room
    /// scan unless a player joins first.
    ///
    /// # Errors
    /// [`PresenceError::InvalidInput`] for an empty id.
    pub async fn create_room(&self, room_id: &str) -> Result<(), PresenceError> {
        let room_id = RoomId::parse(room_id)?;

        self.write(move |state, _| {
            state.store.ensure(&room_id)?;
            tracing::info!(%room_id, "room created");
            Ok(())
        })
        .await
    }

    /// Runs one reaper cycle:
    ///
    /// 1. sweep registry entries older than the heartbeat timeout;
    /// 2. delete each one's record and remove its room if now empty;
    /// 3. remove every other room that holds no records.
    ///
    /// A record that is already gone is not a failure. Any other store
    /// error is logged and skipped so one bad record can't stall
    /// eviction for everyone else; a player whose record could not be
    /// deleted is re-armed so the next cycle tries again.
    pub async fn reap(&self) -> ReapReport {
        let timeout = self.config.heartbeat_timeout();
        let report = self
            .write(move |state, now| Ok(reap_locked(state, now, timeout)))
            .await;

        let report = report.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "reap cycle aborted");
            ReapReport {
                failures: 1,
                ..ReapReport::default()
            }
        });
        if !report.is_empty() {
            tracing::debug!(
                evicted = report.evicted.len(),
                rooms_removed = report.rooms_removed.len(),
                failures = report.failures,
                "reap cycle finished"
            );
        }
        report
    }

    // -----------------------------------------------------------------
    // Reads (read lock)
    // -----------------------------------------------------------------

    /// Reads one player record.
    ///
    /// # Errors
    /// [`PresenceError::PlayerNotFound`] if the player does not exist.
    pub async fn get_player(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<PlayerRecord, PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;
        self.read(move |state| Ok(state.store.get(&room_id, &player_id)?))
            .await
    }

    /// Every record in a room, ordered by player id.
    ///
    /// # Errors
    /// [`PresenceError::RoomNotFound`] if the room does not exist.
    pub async fn list_room_players(
        &self,
        room_id: &str,
    ) -> Result<Vec<PlayerRecord>, PresenceError> {
        let room_id = RoomId::parse(room_id)?;
        self.read(move |state| Ok(state.store.list_by_room(&room_id)?))
            .await
    }

    /// Storage keys of a room's records.
    ///
    /// # Errors
    /// [`PresenceError::RoomNotFound`] if the room does not exist.
    pub async fn list_room_files(&self, room_id: &str) -> Result<Vec<String>, PresenceError> {
        let room_id = RoomId::parse(room_id)?;
        self.read(move |state| Ok(state.store.list_keys(&room_id)?))
            .await
    }

    /// Every room that currently exists, sorted.
    pub async fn list_rooms(&self) -> Result<Vec<RoomId>, PresenceError> {
        self.read(|state| Ok(state.store.rooms()?)).await
    }

    /// When a player last heartbeated, or `None` if not tracked.
    pub async fn last_seen(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<Option<Instant>, PresenceError> {
        let (room_id, player_id) = parse_ids(room_id, player_id)?;
        let state = self.state.read().await;
        Ok(state.registry.last_seen(&room_id, &player_id))
    }

    /// Number of players with a live heartbeat entry.
    pub async fn tracked_players(&self) -> usize {
        self.state.read().await.registry.len()
    }
}

fn parse_ids(room_id: &str, player_id: &str) -> Result<(RoomId, PlayerId), PresenceError> {
    Ok((RoomId::parse(room_id)?, PlayerId::parse(player_id)?))
}

/// Ensures the room and creates the record if absent, as one unit: the
/// key is checked before anything is written, and a room this call
/// created is removed again if the record write fails.
fn join_room<S>(
    store: &mut S,
    room_id: &RoomId,
    player_id: &PlayerId,
    status: &str,
) -> Result<bool, PresenceError>
where
    S: RecordStore + RoomDirectory,
{
    store.check_key(room_id, player_id)?;
    let room_existed = store.exists(room_id)?;
    store.ensure(room_id)?;

    match store.create_if_absent(room_id, player_id, status) {
        Ok(created) => Ok(created),
        Err(e) => {
            if !room_existed {
                if let Err(undo) = store.remove_if_empty(room_id) {
                    tracing::warn!(%room_id, error = %undo, "failed to roll back new room");
                }
            }
            Err(e.into())
        }
    }
}

fn reap_locked<S>(state: &mut PresenceState<S>, now: Instant, timeout: Duration) -> ReapReport
where
    S: RecordStore + RoomDirectory,
{
    let mut report = ReapReport::default();

    for key in state.registry.sweep_expired(now, timeout) {
        let PresenceKey { room_id, player_id } = &key;
        match state.store.delete(room_id, player_id) {
            Ok(()) => {
                tracing::info!(%room_id, %player_id, "player evicted (heartbeat timed out)");
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(%room_id, %player_id, "expired player already deleted");
            }
            Err(e) => {
                tracing::warn!(
                    %room_id,
                    %player_id,
                    error = %e,
                    "failed to evict player, will retry"
                );
                report.failures += 1;
                let rearm = now.checked_sub(timeout).unwrap_or(now);
                state.registry.touch(room_id, player_id, rearm);
                continue;
            }
        }
        remove_room_if_empty(&mut state.store, room_id, &mut report);
        report.evicted.push(key);
    }

    match state.store.rooms() {
        Ok(rooms) => {
            for room_id in &rooms {
                remove_room_if_empty(&mut state.store, room_id, &mut report);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to list rooms for empty-room scan");
            report.failures += 1;
        }
    }

    report
}

fn remove_room_if_empty<S: RoomDirectory>(
    store: &mut S,
    room_id: &RoomId,
    report: &mut ReapReport,
) {
    match store.remove_if_empty(room_id) {
        Ok(true) => {
            tracing::info!(%room_id, "room removed (no players left)");
            report.rooms_removed.push(room_id.clone());
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(%room_id, error = %e, "failed to remove empty room");
            report.failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use beacon_store::MemoryStore;
    use serde_json::json;

    use super::*;
    use crate::ManualClock;

    fn service() -> (PresenceService<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let svc = PresenceService::with_clock(
            MemoryStore::new(),
            PresenceConfig::default(),
            clock.clone(),
        );
        (svc, clock)
    }

    #[tokio::test]
    async fn test_heartbeat_creates_room_record_and_entry() {
        let (svc, _) = service();

        svc.heartbeat("lobby1", "alice").await.unwrap();

        let record = svc.get_player("lobby1", "alice").await.unwrap();
        assert_eq!(record.status(), Some("active"));
        assert!(svc.last_seen("lobby1", "alice").await.unwrap().is_some());
        assert_eq!(svc.list_rooms().await.unwrap(), [RoomId::parse("lobby1").unwrap()]);
    }

    #[tokio::test]
    async fn test_heartbeat_empty_ids_are_invalid_and_mutate_nothing() {
        let (svc, _) = service();

        assert!(matches!(svc.heartbeat("", "alice").await, Err(PresenceError::InvalidInput(_))));
        assert!(matches!(svc.heartbeat("r", "").await, Err(PresenceError::InvalidInput(_))));
        assert!(svc.list_rooms().await.unwrap().is_empty());
        assert_eq!(svc.tracked_players().await, 0);
    }

    #[tokio::test]
    async fn test_heartbeat_does_not_reset_data() {
        let (svc, _) = service();
        svc.heartbeat("r", "p").await.unwrap();
        svc.set_player_data("r", "p", json!({"hp": 3})).await.unwrap();

        svc.heartbeat("r", "p").await.unwrap();

        assert_eq!(svc.get_player("r", "p").await.unwrap().data(), Some(&json!({"hp": 3})));
    }

    #[tokio::test]
    async fn test_create_player_twice_keeps_data() {
        let (svc, _) = service();
        assert!(svc.create_player("r", "p").await.unwrap());
        svc.set_player_data("r", "p", json!({"x": 1})).await.unwrap();

        assert!(!svc.create_player("r", "p").await.unwrap());

        assert_eq!(svc.get_player("r", "p").await.unwrap().data(), Some(&json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_create_player_is_not_tracked_and_never_expires() {
        let (svc, clock) = service();
        svc.create_player("r", "p").await.unwrap();

        clock.advance(Duration::from_secs(3600));
        let report = svc.reap().await;

        assert!(report.evicted.is_empty());
        assert!(svc.get_player("r", "p").await.is_ok());
        assert_eq!(svc.tracked_players().await, 0);
    }

    #[tokio::test]
    async fn test_set_player_data_missing_player_creates_nothing() {
        let (svc, _) = service();

        let result = svc.set_player_data("r", "ghost", json!(1)).await;

        assert!(matches!(result, Err(PresenceError::PlayerNotFound { .. })));
        assert!(svc.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_create_get_set_get() {
        let (svc, _) = service();
        svc.create_player("r", "p").await.unwrap();

        let record = svc.get_player("r", "p").await.unwrap();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"player_id": "p", "room_id": "r", "status": "active"})
        );

        svc.set_player_data("r", "p", json!({"x": 1})).await.unwrap();
        let record = svc.get_player("r", "p").await.unwrap();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"player_id": "p", "room_id": "r", "data": {"x": 1}})
        );
    }

    #[tokio::test]
    async fn test_get_player_missing_returns_not_found() {
        let (svc, _) = service();
        svc.create_room("r").await.unwrap();

        assert!(matches!(
            svc.get_player("r", "nobody").await,
            Err(PresenceError::PlayerNotFound { .. })
        ));
        assert!(matches!(
            svc.get_player("nowhere", "nobody").await,
            Err(PresenceError::PlayerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_last_player_removes_room_and_entry() {
        let (svc, _) = service();
        svc.heartbeat("r", "p").await.unwrap();

        svc.delete_player("r", "p").await.unwrap();

        assert_eq!(svc.tracked_players().await, 0);
        assert!(matches!(
            svc.list_room_players("r").await,
            Err(PresenceError::RoomNotFound(_))
        ));
        assert!(matches!(
            svc.delete_player("r", "p").await,
            Err(PresenceError::PlayerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_keeps_room_with_other_players() {
        let (svc, _) = service();
        svc.heartbeat("r", "a").await.unwrap();
        svc.heartbeat("r", "b").await.unwrap();

        svc.delete_player("r", "a").await.unwrap();

        let players = svc.list_room_players("r").await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].player_id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_create_room_is_idempotent_and_validates() {
        let (svc, _) = service();

        svc.create_room("r").await.unwrap();
        svc.create_room("r").await.unwrap();

        assert!(svc.list_room_players("r").await.unwrap().is_empty());
        assert!(matches!(svc.create_room("").await, Err(PresenceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_reap_evicts_after_timeout_only() {
        let (svc, clock) = service();
        svc.heartbeat("r", "p").await.unwrap();

        clock.advance(Duration::from_secs(15));
        assert!(svc.reap().await.evicted.is_empty());
        assert!(svc.get_player("r", "p").await.is_ok());

        clock.advance(Duration::from_secs(1));
        let report = svc.reap().await;

        assert_eq!(
            report.evicted,
            vec![PresenceKey::new(RoomId::parse("r").unwrap(), PlayerId::parse("p").unwrap())]
        );
        assert_eq!(report.rooms_removed, vec![RoomId::parse("r").unwrap()]);
        assert!(matches!(
            svc.get_player("r", "p").await,
            Err(PresenceError::PlayerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reap_removes_explicitly_created_empty_room() {
        let (svc, _) = service();
        svc.create_room("empty").await.unwrap();

        let report = svc.reap().await;

        assert_eq!(report.rooms_removed, vec![RoomId::parse("empty").unwrap()]);
        assert!(svc.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concrete_lobby_scenario() {
        let (svc, clock) = service();
        svc.create_room("lobby1").await.unwrap();
        svc.heartbeat("lobby1", "alice").await.unwrap();

        let players = svc.list_room_players("lobby1").await.unwrap();
        assert_eq!(
            serde_json::to_value(&players).unwrap(),
            json!([{"player_id": "alice", "room_id": "lobby1", "status": "active"}])
        );

        clock.advance(Duration::from_secs(20));
        svc.reap().await;

        assert!(matches!(
            svc.get_player("lobby1", "alice").await,
            Err(PresenceError::PlayerNotFound { .. })
        ));
        assert!(matches!(
            svc.list_room_players("lobby1").await,
            Err(PresenceError::RoomNotFound(_))
        ));
    }

    /// Delegates to a `MemoryStore`, remembering which threads touched it.
    #[derive(Default)]
    struct ThreadTrackingStore {
        inner: MemoryStore,
        threads: Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>,
    }

    impl ThreadTrackingStore {
        fn note(&self) {
            self.threads.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl RecordStore for ThreadTrackingStore {
        fn create_if_absent(
            &mut self,
            room_id: &RoomId,
            player_id: &PlayerId,
            status: &str,
        ) -> Result<bool, StoreError> {
            self.note();
            self.inner.create_if_absent(room_id, player_id, status)
        }

        fn get(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<PlayerRecord, StoreError> {
            self.note();
            self.inner.get(room_id, player_id)
        }

        fn set(
            &mut self,
            room_id: &RoomId,
            player_id: &PlayerId,
            data: Value,
        ) -> Result<(), StoreError> {
            self.note();
            self.inner.set(room_id, player_id, data)
        }

        fn delete(&mut self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError> {
            self.note();
            self.inner.delete(room_id, player_id)
        }

        fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<PlayerRecord>, StoreError> {
            self.note();
            self.inner.list_by_room(room_id)
        }

        fn list_keys(&self, room_id: &RoomId) -> Result<Vec<String>, StoreError> {
            self.note();
            self.inner.list_keys(room_id)
        }
    }

    impl RoomDirectory for ThreadTrackingStore {
        fn ensure(&mut self, room_id: &RoomId) -> Result<(), StoreError> {
            self.note();
            self.inner.ensure(room_id)
        }

        fn exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
            self.note();
            self.inner.exists(room_id)
        }

        fn remove_if_empty(&mut self, room_id: &RoomId) -> Result<bool, StoreError> {
            self.note();
            self.inner.remove_if_empty(room_id)
        }

        fn rooms(&self) -> Result<Vec<RoomId>, StoreError> {
            self.note();
            self.inner.rooms()
        }
    }

    #[tokio::test]
    async fn test_store_access_runs_off_the_runtime_thread() {
        let store = ThreadTrackingStore::default();
        let threads = Arc::clone(&store.threads);
        let svc = PresenceService::with_clock(store, PresenceConfig::default(), ManualClock::new());
        let runtime_thread = std::thread::current().id();

        svc.heartbeat("r", "p").await.unwrap();
        svc.get_player("r", "p").await.unwrap();
        svc.list_rooms().await.unwrap();
        svc.reap().await;

        let threads = threads.lock().unwrap();
        assert!(!threads.is_empty());
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }
}
