//! Realtime relay for duel.
//!
//! Two interchangeable ways to get an event from one participant to the
//! other. A deployment picks exactly one.
//!
//! 1. **Fan-out gateway** ([`RelayGateway`]): sessions attach to a room;
//!    every frame is forwarded verbatim to the room's other sessions.
//! 2. **Topic broker** ([`Broker`]): sessions subscribe to the room's
//!    topic namespace, announce themselves with presence events, and leave
//!    a last will that reports them gone if they drop.
//!
//! Either way the relay never decodes the frames it carries, and a failed
//! delivery to one recipient is skipped, never surfaced to the sender.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer       ← authoritative writes happen there first
//!     ↓ snapshot
//! Relay Layer (this crate)  ← propagates the snapshot to peers
//!     ↓
//! Transport        ← one WebSocket per session
//! ```

mod broker;
mod error;
mod gateway;
mod presence;
pub mod topic;

pub use broker::{Broker, BrokerMessage, BrokerSession, LastWill, MessageSender};
pub use error::RelayError;
pub use gateway::{Attachment, FrameSender, RelayGateway, SessionId};
pub use presence::{PresenceReaction, PresenceRoster};
