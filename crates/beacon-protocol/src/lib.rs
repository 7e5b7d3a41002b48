//! Shared vocabulary for Beacon.
//!
//! This crate defines what every other layer talks about:
//!
//! - **Identifiers** ([`RoomId`], [`PlayerId`]): validated, non-empty
//!   string newtypes.
//! - **Records** ([`PlayerRecord`], [`PlayerState`]): the persisted shape
//!   of a player inside a room.
//! - **Wire messages** ([`Request`], [`Operation`], [`Reply`],
//!   [`ReplyBody`]): what clients send and what the server answers.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how any of the above
//!   becomes bytes, both on the wire and on disk.
//!
//! ```text
//! Transport (bytes) → Protocol (Request / Reply) → Presence (service calls)
//!                     Protocol (PlayerRecord)    → Store (bytes on disk)
//! ```

mod codec;
mod error;
mod types;
mod wire;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{PlayerId, PlayerRecord, PlayerState, RoomId};
pub use wire::{Operation, Reply, ReplyBody, Request};
