//! Chess, with the rules delegated to a [`ChessEngine`].
//!
//! The room never interprets a chess position itself. The board stores a
//! FEN string plus the move history, and every question about legality or
//! the end of the game goes to the engine.

use duel_protocol::{GameType, Seat};
use serde::{Deserialize, Serialize};

use crate::{GameRules, Outcome, Played, RoomError};

/// Piece a pawn promotes to. Wire names are the lowercase SAN letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Promotion {
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "n")]
    Knight,
}

impl Promotion {
    pub fn as_char(self) -> char {
        match self {
            Self::Queen => 'q',
            Self::Rook => 'r',
            Self::Bishop => 'b',
            Self::Knight => 'n',
        }
    }
}

/// A move in from/to square notation, e.g. `e2` → `e4`.
///
/// Castling is the king's two-square move (`e1` → `g1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

impl ChessMove {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn promoting(mut self, piece: Promotion) -> Self {
        self.promotion = Some(piece);
        self
    }
}

/// One entry of the move history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
    pub seat: Seat,
}

/// The chess board as stored in the room document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessBoard {
    /// Current position in Forsyth-Edwards notation.
    pub fen: String,
    #[serde(default)]
    pub history: Vec<PlayedMove>,
}

/// The rules-engine capability chess is delegated to.
///
/// Positions are FEN strings. Implementations must treat a position they
/// can't parse as having no legal moves.
pub trait ChessEngine: Send + Sync + 'static {
    /// FEN of the standard starting position.
    fn starting_position(&self) -> String;

    fn is_legal(&self, position: &str, mv: &ChessMove) -> bool;

    /// Plays a legal move and returns the resulting position.
    ///
    /// # Errors
    /// [`RoomError::InvalidMove`] if `mv` is not legal in `position`.
    fn apply(&self, position: &str, mv: &ChessMove) -> Result<String, RoomError>;

    /// The side to move is checkmated.
    fn is_checkmate(&self, position: &str) -> bool;

    /// The game is drawn by rule (stalemate, insufficient material or the
    /// fifty-move rule).
    fn is_draw(&self, position: &str) -> bool;
}

/// Chess rules over an engine. White always opens.
#[derive(Debug, Clone, Default)]
pub struct ChessRules<E> {
    engine: E,
}

impl<E: ChessEngine> ChessRules<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Picks the move the engine will accept. A move without a promotion
    /// piece that is only legal as a promotion promotes to a queen.
    fn resolve(&self, position: &str, mv: &ChessMove) -> Result<ChessMove, RoomError> {
        if self.engine.is_legal(position, mv) {
            return Ok(mv.clone());
        }
        if mv.promotion.is_none() {
            let queened = mv.clone().promoting(Promotion::Queen);
            if self.engine.is_legal(position, &queened) {
                return Ok(queened);
            }
        }
        Err(RoomError::InvalidMove(format!(
            "{}{} is not a legal move",
            mv.from, mv.to
        )))
    }
}

impl<E: ChessEngine> GameRules for ChessRules<E> {
    type Board = ChessBoard;
    type Move = ChessMove;

    const GAME_TYPE: GameType = GameType::Chess;
    const OPENING_SEAT: Seat = Seat::White;

    fn initial_board(&self) -> ChessBoard {
        ChessBoard {
            fen: self.engine.starting_position(),
            history: Vec::new(),
        }
    }

    fn precheck(&self, _board: &ChessBoard, mv: &ChessMove) -> Result<(), RoomError> {
        if mv.from.trim().is_empty() || mv.to.trim().is_empty() {
            return Err(RoomError::InvalidMove("move needs from and to squares".into()));
        }
        if mv.from == mv.to {
            return Err(RoomError::InvalidMove(format!("{} to itself", mv.from)));
        }
        Ok(())
    }

    fn play(
        &self,
        board: &ChessBoard,
        mover: Seat,
        mv: &ChessMove,
    ) -> Result<Played<ChessBoard>, RoomError> {
        if !matches!(mover, Seat::White | Seat::Black) {
            return Err(RoomError::InvalidMove(format!("{mover} is not a chess color")));
        }
        self.precheck(board, mv)?;
        let mv = self.resolve(&board.fen, mv)?;
        let fen = self.engine.apply(&board.fen, &mv)?;

        let outcome = if self.engine.is_checkmate(&fen) {
            Outcome::Win(mover)
        } else if self.engine.is_draw(&fen) {
            Outcome::Draw
        } else {
            Outcome::Continue
        };

        let mut history = board.history.clone();
        history.push(PlayedMove {
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion,
            seat: mover,
        });
        Ok(Played {
            board: ChessBoard { fen, history },
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// An engine that knows a fixed set of legal moves, named "from-to" or
    /// "from-to=q". Applying a move appends it to the position string.
    struct ScriptedEngine {
        legal: HashSet<String>,
        mate_after: Option<String>,
        draw_after: Option<String>,
    }

    fn key(mv: &ChessMove) -> String {
        match mv.promotion {
            Some(p) => format!("{}-{}={}", mv.from, mv.to, p.as_char()),
            None => format!("{}-{}", mv.from, mv.to),
        }
    }

    impl ChessEngine for ScriptedEngine {
        fn starting_position(&self) -> String {
            "start".into()
        }
        fn is_legal(&self, _position: &str, mv: &ChessMove) -> bool {
            self.legal.contains(&key(mv))
        }
        fn apply(&self, position: &str, mv: &ChessMove) -> Result<String, RoomError> {
            Ok(format!("{position} {}", key(mv)))
        }
        fn is_checkmate(&self, position: &str) -> bool {
            self.mate_after.as_deref().is_some_and(|m| position.ends_with(m))
        }
        fn is_draw(&self, position: &str) -> bool {
            self.draw_after.as_deref().is_some_and(|m| position.ends_with(m))
        }
    }

    fn rules(legal: &[&str]) -> ChessRules<ScriptedEngine> {
        ChessRules::new(ScriptedEngine {
            legal: legal.iter().map(|s| s.to_string()).collect(),
            mate_after: None,
            draw_after: None,
        })
    }

    #[test]
    fn test_play_legal_move_records_history() {
        let rules = rules(&["e2-e4"]);
        let played = rules
            .play(&rules.initial_board(), Seat::White, &ChessMove::new("e2", "e4"))
            .unwrap();
        assert_eq!(played.board.fen, "start e2-e4");
        assert_eq!(played.outcome, Outcome::Continue);
        assert_eq!(played.board.history.len(), 1);
        assert_eq!(played.board.history[0].seat, Seat::White);
    }

    #[test]
    fn test_play_illegal_move_is_invalid() {
        let rules = rules(&["e2-e4"]);
        let err = rules
            .play(&rules.initial_board(), Seat::White, &ChessMove::new("e2", "e5"))
            .unwrap_err();
        assert!(matches!(err, RoomError::InvalidMove(_)));
    }

    #[test]
    fn test_play_defaults_promotion_to_queen() {
        let rules = rules(&["a7-a8=q", "a7-a8=n"]);
        let played = rules
            .play(&rules.initial_board(), Seat::White, &ChessMove::new("a7", "a8"))
            .unwrap();
        assert_eq!(played.board.history[0].promotion, Some(Promotion::Queen));
    }

    #[test]
    fn test_play_keeps_explicit_underpromotion() {
        let rules = rules(&["a7-a8=q", "a7-a8=n"]);
        let mv = ChessMove::new("a7", "a8").promoting(Promotion::Knight);
        let played = rules.play(&rules.initial_board(), Seat::White, &mv).unwrap();
        assert_eq!(played.board.fen, "start a7-a8=n");
    }

    #[test]
    fn test_play_checkmate_wins_for_mover() {
        let mut rules = rules(&["d8-h4"]);
        rules.engine.mate_after = Some("d8-h4".into());
        let played = rules
            .play(&rules.initial_board(), Seat::Black, &ChessMove::new("d8", "h4"))
            .unwrap();
        assert_eq!(played.outcome, Outcome::Win(Seat::Black));
    }

    #[test]
    fn test_play_engine_draw_is_draw() {
        let mut rules = rules(&["f7-g6"]);
        rules.engine.draw_after = Some("f7-g6".into());
        let played = rules
            .play(&rules.initial_board(), Seat::White, &ChessMove::new("f7", "g6"))
            .unwrap();
        assert_eq!(played.outcome, Outcome::Draw);
    }

    #[test]
    fn test_precheck_rejects_null_move() {
        let rules = rules(&[]);
        assert!(rules
            .precheck(&rules.initial_board(), &ChessMove::new("e2", "e2"))
            .is_err());
    }

    #[test]
    fn test_chess_move_wire_shape() {
        let mv: ChessMove =
            serde_json::from_str(r#"{"from":"e7","to":"e8","promotion":"q"}"#).unwrap();
        assert_eq!(mv.promotion, Some(Promotion::Queen));
        assert_eq!(
            serde_json::to_string(&ChessMove::new("e2", "e4")).unwrap(),
            r#"{"from":"e2","to":"e4"}"#
        );
    }
}
