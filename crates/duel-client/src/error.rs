//! Error types for the client.

use duel_protocol::{ActionFailure, ProtocolError};
use duel_relay::RelayError;
use duel_room::RoomError;

/// Errors a client session can report to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The action was refused locally before anything was sent, e.g. a
    /// move out of turn or onto an occupied cell.
    #[error("rejected locally: {0}")]
    Precheck(#[from] RoomError),

    /// The server refused the action. A `code` of 503 means the room store
    /// failed and the outcome is unknown.
    #[error("rejected by server ({}): {}", .0.code, .0.message)]
    Rejected(ActionFailure),

    /// The session has no room yet; create or join one first.
    #[error("no room loaded")]
    NoRoom,

    /// The server answered with a reply shape that doesn't fit the request.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The connection to the server ended.
    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    /// `true` when the room store (or the link to it) failed, so the
    /// server may or may not have applied the action.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Self::Rejected(failure) => failure.code == 503,
            Self::Closed | Self::WebSocket(_) => true,
            _ => false,
        }
    }
}
