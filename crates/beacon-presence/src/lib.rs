//! Heartbeat-based presence tracking for Beacon.
//!
//! Clients report liveness for a `(room, player)` pair with periodic
//! heartbeats. A player who stops reporting is evicted once the heartbeat
//! timeout elapses, and a room disappears with its last player.
//!
//! # Key types
//!
//! - [`PresenceRegistry`]: in-memory `(room, player) → last heartbeat`
//! - [`PresenceService`]: every public operation, serialized against
//!   the reaper under one coordination lock
//! - [`Reaper`] / [`ReaperHandle`]: the background eviction loop
//! - [`Clock`]: injectable time source ([`TokioClock`], [`ManualClock`])
//! - [`PresenceConfig`]: timeout, poll interval, default status
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / request handler (above)  ← maps requests to service calls
//!     ↕
//! Presence layer (this crate)       ← liveness + consistency
//!     ↕
//! Store layer (below)               ← player records and rooms
//! ```

mod clock;
mod config;
mod error;
mod reaper;
mod registry;
mod service;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::PresenceConfig;
pub use error::PresenceError;
pub use reaper::{Reaper, ReaperHandle};
pub use registry::{PresenceKey, PresenceRegistry};
pub use service::{PresenceService, ReapReport};
