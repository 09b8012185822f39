//! Client side of duel.
//!
//! A [`ClientSession`] is one participant's view of one room. It talks to
//! the room authority through an [`ActionApi`] and to the other
//! participant through a [`RelayLink`]:
//!
//! - [`LocalActions`] / [`RemoteActions`]: an in-process desk or the
//!   server's `/actions` socket.
//! - [`GatewayLink`] / [`BrokerLink`]: in-process fan-out gateway or
//!   broker sessions.
//! - [`WsRelayLink`]: the server's `/relay` or `/broker` socket.
//!
//! Inbound relay frames are read by the caller and passed to
//! [`ClientSession::apply_frame`].

mod api;
mod error;
mod link;
mod session;

pub use api::{ActionApi, LocalActions, RemoteActions};
pub use error::ClientError;
pub use link::{BrokerLink, GatewayLink, RelayLink, WsRelayLink, presence_frame};
pub use session::{Applied, ClientSession, Fullness};
