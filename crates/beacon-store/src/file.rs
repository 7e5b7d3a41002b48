//! File-backed backend: one directory per room, one JSON file per player.
//!
//! ```text
//! <root>/
//!   lobby1/
//!     alice.json   {"player_id":"alice","room_id":"lobby1","status":"active"}
//!     bob.json     {"player_id":"bob","room_id":"lobby1","data":{"x":1}}
//!   lobby2/        (explicitly created, no players yet)
//! ```
//!
//! Only `*.json` files count as records. Writes go to a hidden temporary
//! file that is then renamed over the record, so a reader never sees a
//! half-written file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use beacon_protocol::{Codec, JsonCodec, PlayerId, PlayerRecord, PlayerState, RoomId};
use serde_json::Value;

use crate::{RecordStore, RoomDirectory, StoreError, record_key};

const RECORD_EXTENSION: &str = "json";

/// A [`RecordStore`] + [`RoomDirectory`] rooted at a data directory.
#[derive(Debug)]
pub struct FileStore<C: Codec = JsonCodec> {
    root: PathBuf,
    codec: C,
}

impl FileStore<JsonCodec> {
    /// Opens (creating if needed) a JSON store under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_codec(root, JsonCodec)
    }
}

impl<C: Codec> FileStore<C> {
    /// Opens a store under `root` that encodes records with `codec`.
    pub fn with_codec(root: impl Into<PathBuf>, codec: C) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "file store opened");
        Ok(Self { root, codec })
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn room_dir(&self, room_id: &RoomId) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(path_component(room_id.as_str())?))
    }

    fn record_path(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<PathBuf, StoreError> {
        path_component(player_id.as_str())?;
        Ok(self.room_dir(room_id)?.join(record_key(player_id)))
    }

    fn read_record(&self, path: &Path) -> Result<Option<PlayerRecord>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.codec
            .decode(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: path.display().to_string(),
                source,
            })
    }

    fn write_record(&self, path: &Path, record: &PlayerRecord) -> Result<(), StoreError> {
        let bytes = self.codec.encode(record).map_err(StoreError::Encode)?;
        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
            // A stray temp file would keep the room directory from ever
            // being removed.
            match fs::remove_file(&tmp) {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => {
                    tracing::warn!(
                        path = %tmp.display(),
                        error = %cleanup,
                        "failed to remove temporary record file"
                    );
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Paths of the record files in an existing room directory.
    fn record_files(&self, room_id: &RoomId) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.room_dir(room_id)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::RoomNotFound(room_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl<C: Codec> RecordStore for FileStore<C> {
    fn create_if_absent(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        status: &str,
    ) -> Result<bool, StoreError> {
        let path = self.record_path(room_id, player_id)?;
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(self.room_dir(room_id)?)?;
        let record = PlayerRecord::active(room_id.clone(), player_id.clone(), status);
        self.write_record(&path, &record)?;
        Ok(true)
    }

    fn get(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<PlayerRecord, StoreError> {
        let path = self.record_path(room_id, player_id)?;
        self.read_record(&path)?
            .ok_or_else(|| StoreError::PlayerNotFound(room_id.clone(), player_id.clone()))
    }

    fn set(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        data: Value,
    ) -> Result<(), StoreError> {
        let path = self.record_path(room_id, player_id)?;
        if !path.is_file() {
            return Err(StoreError::PlayerNotFound(room_id.clone(), player_id.clone()));
        }
        let record = PlayerRecord {
            player_id: player_id.clone(),
            room_id: room_id.clone(),
            state: PlayerState::Data { data },
        };
        self.write_record(&path, &record)
    }

    fn delete(&mut self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError> {
        let path = self.record_path(room_id, player_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::PlayerNotFound(room_id.clone(), player_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<PlayerRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.record_files(room_id)? {
            // Deleted between listing and reading: no longer a member.
            if let Some(record) = self.read_record(&path)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Ok(records)
    }

    fn check_key(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), StoreError> {
        self.record_path(room_id, player_id).map(|_| ())
    }

    fn list_keys(&self, room_id: &RoomId) -> Result<Vec<String>, StoreError> {
        Ok(self
            .record_files(room_id)?
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_owned))
            .collect())
    }
}

impl<C: Codec> RoomDirectory for FileStore<C> {
    fn ensure(&mut self, room_id: &RoomId) -> Result<(), StoreError> {
        let dir = self.room_dir(room_id)?;
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            tracing::debug!(%room_id, "room directory created");
        }
        Ok(())
    }

    fn exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        Ok(self.room_dir(room_id)?.is_dir())
    }

    fn remove_if_empty(&mut self, room_id: &RoomId) -> Result<bool, StoreError> {
        let files = match self.record_files(room_id) {
            Ok(files) => files,
            Err(StoreError::RoomNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !files.is_empty() {
            return Ok(false);
        }

        match fs::remove_dir(self.room_dir(room_id)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => {
                tracing::warn!(
                    %room_id,
                    "room has no records but holds other files; keeping it"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rooms(&self) -> Result<Vec<RoomId>, StoreError> {
        let mut rooms = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::debug!(name = ?entry.file_name(), "skipping non-UTF-8 room directory");
                continue;
            };
            if let Ok(room_id) = RoomId::try_from(name) {
                rooms.push(room_id);
            }
        }
        rooms.sort();
        Ok(rooms)
    }
}

/// Checks that an id can be used as a single file name.
fn path_component(id: &str) -> Result<&str, StoreError> {
    if id == "." || id == ".." {
        return Err(StoreError::InvalidKey(id.to_owned(), "reserved path name"));
    }
    if id.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidKey(id.to_owned(), "contains a path separator"));
    }
    Ok(id)
}

/// `<dir>/.<name>.tmp` next to the record it will replace.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
