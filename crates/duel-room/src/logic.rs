//! The `GameRules` trait: what a board game must provide to be played in
//! a room.
//!
//! The lifecycle manager and the move arbiter are generic over this trait.
//! They own seats, turns, rounds and persistence; a `GameRules`
//! implementation only knows its board.

use std::fmt::Debug;

use duel_protocol::{GameType, Seat};
use serde::{Serialize, de::DeserializeOwned};

use crate::RoomError;

/// What a legal move did to the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Play continues with the other seat.
    Continue,
    /// The mover ended the round by winning.
    Win(Seat),
    Draw,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// The result of applying a move.
#[derive(Debug, Clone, PartialEq)]
pub struct Played<B> {
    pub board: B,
    pub outcome: Outcome,
}

/// The rules of one board game.
///
/// Each associated type defines the shape of the game's data:
/// - `Board` is the `board` field of the room document.
/// - `Move` is the `move` payload of a move action.
pub trait GameRules: Send + Sync + 'static {
    type Board: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    type Move: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Which game these rules play.
    const GAME_TYPE: GameType;

    /// The seat that moves first in every round.
    const OPENING_SEAT: Seat;

    /// The board at the start of a round.
    fn initial_board(&self) -> Self::Board;

    /// Seat of the first occupant in round `round_index`. Alternates every
    /// round so the opening move changes hands.
    fn seat_for_round(round_index: u64) -> Seat {
        if round_index % 2 == 0 {
            Self::OPENING_SEAT
        } else {
            Self::OPENING_SEAT.complement()
        }
    }

    /// Cheap validation a client can run before submitting a move.
    /// Default: accept everything and leave it to [`play`](Self::play).
    fn precheck(&self, _board: &Self::Board, _mv: &Self::Move) -> Result<(), RoomError> {
        Ok(())
    }

    /// Applies `mv` for `mover` and reports what it did to the round.
    ///
    /// Turn order and terminal state are checked by the caller before this
    /// is called. Implementations only reject moves that are illegal on
    /// the board, with [`RoomError::InvalidMove`].
    fn play(
        &self,
        board: &Self::Board,
        mover: Seat,
        mv: &Self::Move,
    ) -> Result<Played<Self::Board>, RoomError>;
}
