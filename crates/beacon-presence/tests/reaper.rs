//! Integration tests for the reaper loop.
//!
//! Uses `start_paused = true` so tokio's clock (which `TokioClock` and the
//! reaper's interval both follow) jumps straight to the next timer
//! whenever every task is idle. A 90-second scenario runs instantly and
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use beacon_presence::{PresenceConfig, PresenceError, PresenceService, Reaper};
use beacon_store::MemoryStore;
use tokio::time::sleep;

fn service() -> Arc<PresenceService<MemoryStore>> {
    Arc::new(PresenceService::new(MemoryStore::new(), PresenceConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn test_silent_player_is_present_before_timeout_and_gone_after() {
    let svc = service();
    let reaper = Reaper::spawn(Arc::clone(&svc));

    svc.heartbeat("lobby1", "alice").await.unwrap();

    sleep(Duration::from_secs(14)).await;
    assert!(svc.get_player("lobby1", "alice").await.is_ok());

    // timeout (15s) + one poll interval (1s), plus slack for the tick.
    sleep(Duration::from_millis(2_500)).await;
    assert!(matches!(
        svc.get_player("lobby1", "alice").await,
        Err(PresenceError::PlayerNotFound { .. })
    ));
    assert!(matches!(
        svc.list_room_players("lobby1").await,
        Err(PresenceError::RoomNotFound(_))
    ));
    assert_eq!(svc.tracked_players().await, 0);

    reaper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_steady_heartbeats_are_never_evicted() {
    let svc = service();
    let reaper = Reaper::spawn(Arc::clone(&svc));
    let half_timeout = svc.config().heartbeat_timeout() / 2;

    // 12 rounds of 7.5s: 90 reaper cycles.
    for _ in 0..12 {
        svc.heartbeat("r", "steady").await.unwrap();
        sleep(half_timeout).await;
        assert!(
            svc.get_player("r", "steady").await.is_ok(),
            "player heartbeating every timeout/2 must survive"
        );
    }

    reaper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_heartbeats_and_silent_players() {
    let svc = service();
    let reaper = Reaper::spawn(Arc::clone(&svc));

    svc.heartbeat("r", "silent").await.unwrap();
    let steady = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            for _ in 0..10 {
                svc.heartbeat("r", "steady").await.unwrap();
                sleep(Duration::from_secs(5)).await;
            }
        })
    };

    sleep(Duration::from_secs(20)).await;

    assert!(svc.get_player("r", "steady").await.is_ok());
    assert!(svc.get_player("r", "silent").await.is_err());
    let players = svc.list_room_players("r").await.unwrap();
    assert_eq!(players.len(), 1);

    steady.await.unwrap();
    reaper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_room_reappears_after_heartbeat() {
    let svc = service();
    let reaper = Reaper::spawn(Arc::clone(&svc));
    svc.heartbeat("r", "p").await.unwrap();

    sleep(Duration::from_secs(20)).await;
    assert!(svc.list_rooms().await.unwrap().is_empty());

    svc.heartbeat("r", "p").await.unwrap();
    assert_eq!(svc.list_room_players("r").await.unwrap().len(), 1);

    reaper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_eviction() {
    let svc = service();
    let reaper = Reaper::spawn(Arc::clone(&svc));
    assert!(reaper.is_running());
    reaper.shutdown().await;

    svc.heartbeat("r", "p").await.unwrap();
    sleep(Duration::from_secs(60)).await;

    assert!(svc.get_player("r", "p").await.is_ok());
}
