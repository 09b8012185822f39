//! Error types for the relay layer.

use duel_protocol::ProtocolError;

/// Errors that can occur while attaching to or publishing through a relay.
///
/// Delivery to an individual recipient never produces one of these: a
/// recipient that went away is skipped, and the frame still counts as
/// published.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A publish topic was empty or contained a wildcard.
    #[error("invalid topic {0:?}")]
    InvalidTopic(String),

    /// A subscription filter used `+` or `#` anywhere but a whole level,
    /// or `#` anywhere but the last level.
    #[error("invalid topic filter {0:?}")]
    InvalidFilter(String),

    /// The relay session was already closed.
    #[error("relay session closed")]
    Closed,

    /// A relay frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
