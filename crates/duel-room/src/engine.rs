//! [`ChessEngine`] backed by the `shakmaty` move generator.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, File, Move, Position, Role, Square};

use crate::chess::{ChessEngine, ChessMove, Promotion};
use crate::RoomError;

/// Standard chess via `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyEngine;

fn parse_position(position: &str) -> Option<Chess> {
    let fen: Fen = position.parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}

fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

fn role(piece: Promotion) -> Role {
    match piece {
        Promotion::Queen => Role::Queen,
        Promotion::Rook => Role::Rook,
        Promotion::Bishop => Role::Bishop,
        Promotion::Knight => Role::Knight,
    }
}

/// The square a move lands the moving piece on. Castling is reported as
/// the king's destination rather than the rook's square.
fn destination(m: &Move) -> Square {
    match *m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Square::from_coords(file, king.rank())
        }
        _ => m.to(),
    }
}

fn find_move(pos: &Chess, mv: &ChessMove) -> Option<Move> {
    let from: Square = mv.from.trim().to_ascii_lowercase().parse().ok()?;
    let to: Square = mv.to.trim().to_ascii_lowercase().parse().ok()?;
    let promotion = mv.promotion.map(role);
    pos.legal_moves()
        .into_iter()
        .find(|m| m.from() == Some(from) && destination(m) == to && m.promotion() == promotion)
}

impl ChessEngine for ShakmatyEngine {
    fn starting_position(&self) -> String {
        to_fen(&Chess::default())
    }

    fn is_legal(&self, position: &str, mv: &ChessMove) -> bool {
        parse_position(position).is_some_and(|pos| find_move(&pos, mv).is_some())
    }

    fn apply(&self, position: &str, mv: &ChessMove) -> Result<String, RoomError> {
        let mut pos = parse_position(position)
            .ok_or_else(|| RoomError::InvalidMove(format!("unreadable position {position:?}")))?;
        let m = find_move(&pos, mv).ok_or_else(|| {
            RoomError::InvalidMove(format!("{}{} is not a legal move", mv.from, mv.to))
        })?;
        pos.play_unchecked(&m);
        Ok(to_fen(&pos))
    }

    fn is_checkmate(&self, position: &str) -> bool {
        parse_position(position).is_some_and(|pos| pos.is_checkmate())
    }

    fn is_draw(&self, position: &str) -> bool {
        parse_position(position).is_some_and(|pos| {
            pos.is_stalemate() || pos.is_insufficient_material() || pos.halfmoves() >= 100
        })
    }
}
