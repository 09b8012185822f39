//! The room document: the single persisted record of one room.
//!
//! A room is keyed by `(gameType, roomId)` and always written back whole.
//! Every snapshot a client sees is one of these documents, so the field
//! names follow the JSON shape clients consume (camelCase).

use std::time::{SystemTime, UNIX_EPOCH};

use duel_protocol::{GameType, RoomCode, Seat, Winner};
use serde::{Deserialize, Serialize};

use crate::RoomStatus;

/// Milliseconds since the Unix epoch, for `createdAt`/`updatedAt`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Player names are matched case-insensitively, ignoring surrounding
/// whitespace. `"Alice "` and `"alice"` are the same player.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// One occupant of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,

    /// `None` only in documents written by something other than the
    /// lifecycle manager; seats assigned here are always set.
    #[serde(default)]
    pub seat: Option<Seat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Player {
    pub fn new(name: &str, seat: Seat, avatar: Option<String>) -> Self {
        Self {
            name: name.trim().to_string(),
            seat: Some(seat),
            avatar,
        }
    }
}

/// A room and its current round. `B` is the game's board type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room<B> {
    pub game_type: GameType,
    pub room_id: RoomCode,

    /// At most two entries, in join order.
    pub players: Vec<Player>,

    pub board: B,

    /// The seat allowed to move next. Left on the final mover once the
    /// round is terminal.
    pub turn: Seat,

    /// Completed rounds. Even rounds give the first occupant the opening
    /// seat.
    pub round_index: u64,

    pub winner: Option<Winner>,

    pub last_move_by: Option<String>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl<B> Room<B> {
    /// Looks up an occupant by name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| names_match(&p.name, name))
    }

    /// Returns `true` if `name` occupies this room.
    pub fn has_player(&self, name: &str) -> bool {
        self.player(name).is_some()
    }

    /// The seat held by `name`, if they are seated.
    pub fn seat_of(&self, name: &str) -> Option<Seat> {
        self.player(name).and_then(|p| p.seat)
    }

    /// Names of all occupants, in join order.
    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_full(&self, max_players: usize) -> bool {
        self.players.len() >= max_players
    }

    pub fn status(&self, max_players: usize) -> RoomStatus {
        if self.winner.is_some() {
            RoomStatus::Terminal
        } else if self.is_full(max_players) {
            RoomStatus::InProgress
        } else {
            RoomStatus::WaitingForPlayers
        }
    }
}
