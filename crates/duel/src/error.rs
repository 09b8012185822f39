//! Unified error type for the duel server.

use duel_protocol::ProtocolError;
use duel_relay::RelayError;
use duel_room::RoomError;
use duel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// The configuration file or an override is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
