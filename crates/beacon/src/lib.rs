//! # Beacon
//!
//! Tracks which players are alive in which rooms from periodic
//! heartbeats, and evicts players that go quiet.
//!
//! This crate is the server: a WebSocket front end that turns JSON
//! requests into [`PresenceService`](beacon_presence::PresenceService)
//! calls and runs the reaper alongside.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beacon::prelude::*;
//!
//! # async fn start() -> Result<(), BeaconError> {
//! let server = BeaconServerBuilder::new()
//!     .bind("0.0.0.0:5000")
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::BeaconError;
pub use handler::dispatch;
pub use server::{BeaconServer, BeaconServerBuilder};

/// Everything needed to run a server, in one import.
pub mod prelude {
    pub use crate::{BeaconError, BeaconServer, BeaconServerBuilder, ServerConfig, dispatch};
    pub use beacon_presence::{
        Clock, ManualClock, PresenceConfig, PresenceError, PresenceService, Reaper, ReaperHandle,
        TokioClock,
    };
    pub use beacon_protocol::{
        Codec, JsonCodec, Operation, PlayerId, PlayerRecord, PlayerState, Reply, ReplyBody,
        Request, RoomId,
    };
    pub use beacon_store::{FileStore, MemoryStore, RecordStore, RoomDirectory};
}
