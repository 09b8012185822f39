//! Rooms for duel: documents, game rules, lifecycle and move arbitration.
//!
//! A room is one persisted document (see [`Room`]) holding two seats, a
//! board and the round's result. Two components write it:
//!
//! - [`RoomLifecycle`] creates rooms, seats players and starts rounds.
//! - [`MoveArbiter`] judges and applies moves.
//!
//! Both are generic over the game ([`GameRules`]) and the persistence
//! ([`RoomStore`]), and both write the whole authoritative snapshot back.
//! [`ActionDesk`] puts the pair behind the uniform action request/reply
//! shape.
//!
//! # Key types
//!
//! - [`GameRules`]: the trait a board game implements
//! - [`TicTacToeRules`], [`ChessRules`]: the two games
//! - [`ChessEngine`]: where chess legality is delegated
//! - [`RoomStore`], [`MemoryRoomStore`]: persistence
//! - [`RoomStatus`]: derived lifecycle state

mod arbiter;
mod chess;
mod config;
mod desk;
#[cfg(feature = "shakmaty")]
mod engine;
mod error;
mod logic;
mod manager;
mod room;
mod store;
mod tictactoe;

pub use arbiter::MoveArbiter;
pub use chess::{ChessBoard, ChessEngine, ChessMove, ChessRules, PlayedMove, Promotion};
pub use config::{RoomConfig, RoomStatus};
pub use desk::ActionDesk;
#[cfg(feature = "shakmaty")]
pub use engine::ShakmatyEngine;
pub use error::RoomError;
pub use logic::{GameRules, Outcome, Played};
pub use manager::{ListFilter, RoomLifecycle};
pub use room::{Player, Room, names_match, now_millis};
pub use store::{MemoryRoomStore, RoomPatch, RoomStore};
pub use tictactoe::{Cell, Grid, TicTacToeRules, line_winner};

/// Chess played with the bundled engine.
#[cfg(feature = "shakmaty")]
pub type StandardChess = ChessRules<ShakmatyEngine>;
