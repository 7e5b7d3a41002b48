//! Unified error type for the Beacon server.

use std::path::PathBuf;

use beacon_presence::PresenceError;
use beacon_protocol::ProtocolError;
use beacon_store::StoreError;
use beacon_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each layer variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// Socket-level failure (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Storage failure while opening or using a store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A presence operation failed.
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// The config file could not be read or written.
    #[error("config file {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
