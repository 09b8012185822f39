//! Wire protocol for duel.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Identifiers** ([`GameType`], [`RoomCode`], [`ClientId`], [`Seat`],
//!   [`Winner`]): small values that appear in every frame.
//! - **Actions** ([`ActionRequest`], [`ActionReply`]): the uniform
//!   request/reply shape for create, join, move, finish, get and list.
//! - **Relay events** ([`RelayEvent`], [`EventHeader`]): what participants
//!   publish to each other in realtime.
//! - **Endpoints** ([`Endpoint`]): which WebSocket path serves what.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   bytes.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room and
//! relay layers. It knows nothing about connections or game rules.
//!
//! ```text
//! Transport (bytes) → Protocol (ActionRequest / RelayEvent) → Room / Relay
//! ```

mod action;
mod codec;
mod endpoint;
mod error;
mod event;
mod types;

pub use action::{Action, ActionFailure, ActionReply, ActionRequest};
pub use codec::{Codec, JsonCodec};
pub use endpoint::Endpoint;
pub use error::ProtocolError;
pub use event::{EventHeader, RelayEvent};
pub use types::{ClientId, GameType, PresenceAction, RoomCode, Seat, Winner};
