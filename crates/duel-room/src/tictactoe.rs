//! Tic-tac-toe on a 3×3 grid.

use duel_protocol::{GameType, Seat};
use serde::{Deserialize, Serialize};

use crate::{GameRules, Outcome, Played, RoomError};

/// Row-major 3×3 grid. Empty cells are `null` on the wire.
pub type Grid = [[Option<Seat>; 3]; 3];

/// The eight winning lines as (row, col) triples.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// A placement on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Returns the symbol that owns a complete line, if any.
pub fn line_winner(grid: &Grid) -> Option<Seat> {
    LINES.iter().find_map(|line| {
        let [a, b, c] = line.map(|(r, col)| grid[r][col]);
        match (a, b, c) {
            (Some(a), Some(b), Some(c)) if a == b && b == c => Some(a),
            _ => None,
        }
    })
}

fn is_full(grid: &Grid) -> bool {
    grid.iter().flatten().all(Option::is_some)
}

/// Tic-tac-toe rules. X always opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToeRules;

impl GameRules for TicTacToeRules {
    type Board = Grid;
    type Move = Cell;

    const GAME_TYPE: GameType = GameType::TicTacToe;
    const OPENING_SEAT: Seat = Seat::X;

    fn initial_board(&self) -> Grid {
        [[None; 3]; 3]
    }

    fn precheck(&self, board: &Grid, mv: &Cell) -> Result<(), RoomError> {
        if mv.row > 2 || mv.col > 2 {
            return Err(RoomError::InvalidMove(format!(
                "cell ({}, {}) is outside the 3x3 grid",
                mv.row, mv.col
            )));
        }
        if board[mv.row][mv.col].is_some() {
            return Err(RoomError::InvalidMove(format!(
                "cell ({}, {}) is already occupied",
                mv.row, mv.col
            )));
        }
        Ok(())
    }

    fn play(&self, board: &Grid, mover: Seat, mv: &Cell) -> Result<Played<Grid>, RoomError> {
        if !matches!(mover, Seat::X | Seat::O) {
            return Err(RoomError::InvalidMove(format!(
                "{mover} is not a tic-tac-toe symbol"
            )));
        }
        self.precheck(board, mv)?;

        let mut next = *board;
        next[mv.row][mv.col] = Some(mover);

        let outcome = match line_winner(&next) {
            Some(seat) => Outcome::Win(seat),
            None if is_full(&next) => Outcome::Draw,
            None => Outcome::Continue,
        };
        Ok(Played {
            board: next,
            outcome,
        })
    }
}
