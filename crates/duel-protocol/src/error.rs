//! Error types for the protocol layer.
//!
//! Each crate in duel defines its own error enum. When you see a
//! `ProtocolError`, the problem is in how a frame or identifier was
//! written, not in networking or room rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated frames.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates protocol rules, e.g. a `move`
    /// action without a move.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A room code was empty or contained characters other than
    /// ASCII letters and digits.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// A connection asked for a path the server doesn't serve.
    #[error("unknown endpoint: {0:?}")]
    UnknownEndpoint(String),

    /// The `gameType` string names no known game.
    #[error("unknown game type: {0:?}")]
    UnknownGameType(String),
}
