//! Room configuration and status.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room of a lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Seats per room. The games here are two-player only.
    pub max_players: usize,

    /// Length of generated room codes.
    pub code_length: usize,

    /// How recently a room must have been updated to count as online
    /// when listing with the online filter.
    pub online_window: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            code_length: 6,
            online_window: Duration::from_secs(300),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Where a room is in its round.
///
/// Unlike a stored field, the status is derived from the document every
/// time it is asked for, so it can never disagree with the seats and the
/// winner:
///
/// ```text
/// WaitingForPlayers → InProgress → Terminal
///          ↑                           │
///          └──────── finish() ─────────┘   (InProgress if both stay seated)
/// ```
///
/// - **WaitingForPlayers**: fewer occupants than seats. The room accepts
///   joins.
/// - **InProgress**: both seats taken, no result yet.
/// - **Terminal**: the round has a winner or ended in a draw. Moves are
///   rejected until `finish` starts the next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    WaitingForPlayers,
    InProgress,
    Terminal,
}
