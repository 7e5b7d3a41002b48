//! Integration tests for the file-backed store against a real directory.

use std::fs;

use beacon_protocol::{PlayerId, RoomId};
use beacon_store::{FileStore, RecordStore, RoomDirectory, StoreError};
use serde_json::json;
use tempfile::TempDir;

fn room(id: &str) -> RoomId {
    RoomId::parse(id).unwrap()
}

fn player(id: &str) -> PlayerId {
    PlayerId::parse(id).unwrap()
}

fn open() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("data")).expect("store should open");
    (dir, store)
}

#[test]
fn test_create_writes_one_json_file_per_player() {
    let (_dir, mut store) = open();

    assert!(store.create_if_absent(&room("lobby1"), &player("alice"), "active").unwrap());

    let path = store.root().join("lobby1").join("alice.json");
    let on_disk: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(
        on_disk,
        json!({"player_id": "alice", "room_id": "lobby1", "status": "active"})
    );
}

#[test]
fn test_create_twice_does_not_overwrite_data() {
    let (_dir, mut store) = open();
    store.create_if_absent(&room("r"), &player("p"), "active").unwrap();
    store.set(&room("r"), &player("p"), json!({"x": 1})).unwrap();

    assert!(!store.create_if_absent(&room("r"), &player("p"), "active").unwrap());

    let record = store.get(&room("r"), &player("p")).unwrap();
    assert_eq!(record.data(), Some(&json!({"x": 1})));
    assert_eq!(record.status(), None);
}

#[test]
fn test_set_missing_player_creates_nothing() {
    let (_dir, mut store) = open();

    let result = store.set(&room("r"), &player("ghost"), json!(true));

    assert!(matches!(result, Err(StoreError::PlayerNotFound(..))));
    assert!(!store.exists(&room("r")).unwrap());
}

#[test]
fn test_get_and_delete_missing_player_return_not_found() {
    let (_dir, mut store) = open();
    store.ensure(&room("r")).unwrap();

    assert!(matches!(
        store.get(&room("r"), &player("p")),
        Err(StoreError::PlayerNotFound(..))
    ));
    assert!(matches!(
        store.delete(&room("r"), &player("p")),
        Err(StoreError::PlayerNotFound(..))
    ));
}

#[test]
fn test_list_ignores_non_record_files() {
    let (_dir, mut store) = open();
    store.create_if_absent(&room("r"), &player("bob"), "active").unwrap();
    store.create_if_absent(&room("r"), &player("amy"), "active").unwrap();
    fs::write(store.root().join("r").join("notes.txt"), b"hello").unwrap();

    let players: Vec<String> = store
        .list_by_room(&room("r"))
        .unwrap()
        .into_iter()
        .map(|r| r.player_id.to_string())
        .collect();
    assert_eq!(players, ["amy", "bob"]);
    assert_eq!(store.list_keys(&room("r")).unwrap(), ["amy.json", "bob.json"]);
}

#[test]
fn test_list_missing_room_returns_room_not_found() {
    let (_dir, store) = open();

    assert!(matches!(
        store.list_by_room(&room("nowhere")),
        Err(StoreError::RoomNotFound(_))
    ));
    assert!(matches!(
        store.list_keys(&room("nowhere")),
        Err(StoreError::RoomNotFound(_))
    ));
}

#[test]
fn test_remove_if_empty_removes_directory_only_when_empty() {
    let (_dir, mut store) = open();
    store.create_if_absent(&room("r"), &player("p"), "active").unwrap();

    assert!(!store.remove_if_empty(&room("r")).unwrap());

    store.delete(&room("r"), &player("p")).unwrap();
    assert!(store.remove_if_empty(&room("r")).unwrap());
    assert!(!store.root().join("r").exists());
    assert!(!store.remove_if_empty(&room("r")).unwrap());
}

#[test]
fn test_rooms_lists_directories_sorted() {
    let (_dir, mut store) = open();
    store.ensure(&room("b")).unwrap();
    store.create_if_absent(&room("a"), &player("p"), "active").unwrap();
    fs::write(store.root().join("stray.txt"), b"not a room").unwrap();

    assert_eq!(store.rooms().unwrap(), [room("a"), room("b")]);
}

#[test]
fn test_path_like_ids_are_rejected() {
    let (_dir, mut store) = open();

    assert!(matches!(
        store.create_if_absent(&room(".."), &player("p"), "active"),
        Err(StoreError::InvalidKey(..))
    ));
    assert!(matches!(
        store.create_if_absent(&room("r"), &player("a/b"), "active"),
        Err(StoreError::InvalidKey(..))
    ));
}

#[test]
fn test_corrupt_record_is_reported() {
    let (_dir, mut store) = open();
    store.ensure(&room("r")).unwrap();
    fs::write(store.root().join("r").join("p.json"), b"{broken").unwrap();

    assert!(matches!(
        store.get(&room("r"), &player("p")),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = FileStore::open(dir.path()).unwrap();
        store.create_if_absent(&room("r"), &player("p"), "active").unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.get(&room("r"), &player("p")).unwrap().status(), Some("active"));
}
