//! Server configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_presence::PresenceConfig;
use serde::{Deserialize, Serialize};

use crate::BeaconError;

/// Everything `beacond` reads from its JSON config file.
///
/// Every field is optional in the file; missing ones take the defaults
/// below.
///
/// ```json
/// {
///   "server_name": "Friday Night",
///   "bind": "0.0.0.0:5000",
///   "data_dir": "data",
///   "presence": { "heartbeat_timeout_secs": 15 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Display name, logged at startup. Default: `"Default Server"`.
    pub server_name: String,

    /// Listen address. Default: `"0.0.0.0:5000"`.
    pub bind: String,

    /// Directory for player records. `null` keeps everything in memory.
    /// Default: `"data"`.
    pub data_dir: Option<PathBuf>,

    /// A connection that sends nothing for this long is closed.
    /// Default: 60 seconds.
    pub idle_timeout_secs: u64,

    /// Heartbeat timeout and reaper timing.
    pub presence: PresenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "Default Server".to_owned(),
            bind: "0.0.0.0:5000".to_owned(),
            data_dir: Some(PathBuf::from("data")),
            idle_timeout_secs: 60,
            presence: PresenceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads a config file.
    ///
    /// # Errors
    /// [`BeaconError::ConfigIo`] if the file can't be read,
    /// [`BeaconError::ConfigParse`] if it isn't a valid config.
    pub fn load(path: &Path) -> Result<Self, BeaconError> {
        let bytes = fs::read(path).map_err(|source| BeaconError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| BeaconError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a config file, first writing the defaults to it if it
    /// doesn't exist.
    pub fn load_or_create(path: &Path) -> Result<Self, BeaconError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "config file not found, wrote defaults");
            return Ok(config);
        }
        Self::load(path)
    }

    /// Writes this config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), BeaconError> {
        let io_err = |source| BeaconError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_vec_pretty(self).map_err(|source| BeaconError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, json).map_err(io_err)
    }

    /// The idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
