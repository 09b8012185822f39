//! Move arbitration: the single place a move is judged and applied.

use std::sync::Arc;

use duel_protocol::{RoomCode, Winner};

use crate::{GameRules, Outcome, Room, RoomError, RoomPatch, RoomStore};

/// Validates and applies moves against the stored room.
///
/// Checks run in a fixed order, and the first failure wins:
///
/// 1. the room exists ([`RoomError::NotFound`])
/// 2. the actor holds a seat ([`RoomError::InvalidMove`])
/// 3. the round is not over ([`RoomError::TerminalState`])
/// 4. it is the actor's turn ([`RoomError::TurnViolation`])
/// 5. the move is legal on the board ([`RoomError::InvalidMove`])
///
/// A rejected move never touches the store.
pub struct MoveArbiter<G: GameRules, S> {
    rules: Arc<G>,
    store: Arc<S>,
}

impl<G: GameRules, S> Clone for MoveArbiter<G, S> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            store: Arc::clone(&self.store),
        }
    }
}

impl<G, S> MoveArbiter<G, S>
where
    G: GameRules,
    S: RoomStore<G::Board>,
{
    pub fn new(rules: Arc<G>, store: Arc<S>) -> Self {
        Self { rules, store }
    }

    /// Applies `mv` for `actor` and returns the post-move room.
    ///
    /// The turn passes to the other seat unless the move ended the round,
    /// in which case `winner` is set and `turn` stays on the mover.
    pub async fn submit_move(
        &self,
        room_id: &RoomCode,
        actor: &str,
        mv: &G::Move,
    ) -> Result<Room<G::Board>, RoomError> {
        let room = self
            .store
            .get(G::GAME_TYPE, room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let seat = room.seat_of(actor).ok_or_else(|| {
            RoomError::InvalidMove(format!("{actor} has no seat in room {room_id}"))
        })?;

        if room.winner.is_some() {
            return Err(RoomError::TerminalState(room_id.clone()));
        }
        if room.turn != seat {
            tracing::debug!(%room_id, actor, %seat, turn = %room.turn, "move out of turn");
            return Err(RoomError::TurnViolation {
                expected: room.turn,
                actual: seat,
            });
        }

        let played = self.rules.play(&room.board, seat, mv)?;
        let (turn, winner) = match played.outcome {
            Outcome::Continue => (seat.complement(), None),
            Outcome::Win(winner) => (seat, Some(Winner::Seat(winner))),
            Outcome::Draw => (seat, Some(Winner::Draw)),
        };

        let room = self
            .store
            .update(
                G::GAME_TYPE,
                room_id,
                RoomPatch {
                    board: Some(played.board),
                    turn: Some(turn),
                    winner: Some(winner),
                    last_move_by: Some(Some(actor.trim().to_string())),
                    ..RoomPatch::default()
                },
            )
            .await?;

        if let Some(winner) = room.winner {
            tracing::info!(%room_id, actor, %winner, "round over");
        } else {
            tracing::debug!(%room_id, actor, %seat, "move applied");
        }
        Ok(room)
    }
}
