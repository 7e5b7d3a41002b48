//! Presence configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and defaults for presence tracking.
///
/// Deserializable with every field optional, so a config file only needs
/// to name what it changes:
///
/// ```json
/// { "heartbeat_timeout_secs": 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// A player whose last heartbeat is older than this is evicted.
    ///
    /// Default: 15 seconds.
    pub heartbeat_timeout_secs: u64,

    /// How often the reaper scans for expired players, in milliseconds.
    /// A player is therefore gone at most `timeout + interval` after its
    /// last heartbeat.
    ///
    /// Default: 1000 ms.
    pub reap_interval_ms: u64,

    /// Status written into records created by the server.
    ///
    /// Default: `"active"`.
    pub default_status: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: 15,
            reap_interval_ms: 1_000,
            default_status: "active".to_owned(),
        }
    }
}

impl PresenceConfig {
    /// Smallest accepted reap interval.
    pub const MIN_REAP_INTERVAL_MS: u64 = 10;

    /// Clamps values that would break the reaper.
    ///
    /// - `reap_interval_ms` raised to [`Self::MIN_REAP_INTERVAL_MS`]
    ///   (a zero-length interval would spin).
    /// - `heartbeat_timeout_secs` raised to 1 (zero would evict every
    ///   player on the first scan after their heartbeat).
    pub fn validated(mut self) -> Self {
        if self.reap_interval_ms < Self::MIN_REAP_INTERVAL_MS {
            tracing::warn!(
                reap_interval_ms = self.reap_interval_ms,
                min = Self::MIN_REAP_INTERVAL_MS,
                "reap interval below minimum, clamping"
            );
            self.reap_interval_ms = Self::MIN_REAP_INTERVAL_MS;
        }
        if self.heartbeat_timeout_secs == 0 {
            tracing::warn!("heartbeat timeout of 0s, clamping to 1s");
            self.heartbeat_timeout_secs = 1;
        }
        self
    }

    /// The heartbeat timeout as a [`Duration`].
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// The reap interval as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }
}
