//! Error types for the room layer.

use duel_protocol::{ProtocolError, RoomCode, Seat};

/// Errors that can occur during room operations.
///
/// Every variant except [`Store`](RoomError::Store) is a rejected action:
/// the room document was not touched and the caller gets a descriptive
/// message. `Store` means the room store itself failed, so the outcome is
/// unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both seats are taken.
    #[error("room {0} is full")]
    Full(RoomCode),

    /// The move target is out of range or occupied, the rules engine
    /// rejected the move, or the actor holds no seat.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// A seat acted out of turn.
    #[error("not your turn: {actual} tried to move but it is {expected}'s turn")]
    TurnViolation { expected: Seat, actual: Seat },

    /// The round already has a winner or ended in a draw.
    #[error("room {0} has finished; no further moves until the next round")]
    TerminalState(RoomCode),

    /// The room store could not be read or written.
    #[error("room store unavailable: {0}")]
    Store(String),

    /// The request itself was unusable: a bad room code, a missing
    /// player name, or a move that doesn't decode for this game.
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl From<ProtocolError> for RoomError {
    fn from(err: ProtocolError) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl RoomError {
    /// HTTP-style status code reported on the action surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Full(_) => 403,
            Self::InvalidMove(_)
            | Self::TurnViolation { .. }
            | Self::TerminalState(_)
            | Self::Malformed(_) => 400,
            Self::Store(_) => 503,
        }
    }

    /// `true` for rejections the acting client caused; `false` when the
    /// store failed and the outcome of the action is unknown.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
