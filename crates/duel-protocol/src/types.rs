//! Identifier and value types shared by every layer.
//!
//! These are the small, copyable vocabulary of the system: which game a
//! room plays, how a room is addressed, which seat a player holds, and who
//! won. They all serialize to plain JSON strings so browser clients never
//! see Rust enum encodings.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// GameType
// ---------------------------------------------------------------------------

/// The board game a room plays.
///
/// Together with a [`RoomCode`] this forms the key of a room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    TicTacToe,
    Chess,
}

impl GameType {
    /// The wire name, as used in `gameType` fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TicTacToe => "tictactoe",
            Self::Chess => "chess",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tictactoe" => Ok(Self::TicTacToe),
            "chess" => Ok(Self::Chess),
            other => Err(ProtocolError::UnknownGameType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Characters used for generated room codes (base 36, uppercase).
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A short, shareable room code.
///
/// Codes are case-insensitive: every constructor normalizes to uppercase,
/// so `"ab12cd"` and `"AB12CD"` address the same room and compare equal.
///
/// Deserialization runs through [`RoomCode::parse`], which means a
/// `RoomCode` inside a decoded frame is always normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Longest code accepted by [`parse`](Self::parse).
    pub const MAX_LEN: usize = 32;

    /// Normalizes a caller-supplied code.
    ///
    /// Leading/trailing whitespace is dropped and letters are uppercased.
    /// Anything else is accepted verbatim as long as it is made of ASCII
    /// letters and digits.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidRoomCode`] for empty, overlong, or
    /// non-alphanumeric input.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty()
            || code.len() > Self::MAX_LEN
            || !code.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Generates a random code of `len` base-36 characters, clamped to
    /// `1..=MAX_LEN` so the result always parses.
    pub fn generate(len: usize) -> Self {
        let mut rng = rand::rng();
        let code = (0..len.clamp(1, Self::MAX_LEN))
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Session-scoped identifier of one client instance.
///
/// Regenerated every time a client starts, and unrelated to the player's
/// display name. Every relay event carries the sender's `ClientId` so the
/// sender can recognize and drop its own echo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh 128-bit id rendered as 32 lowercase hex chars.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// A player's role in a round: a symbol in tic-tac-toe, a color in chess.
///
/// The seat decides turn order. Seats of the two players in a room are
/// always complementary, and they swap at the end of every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    X,
    O,
    #[serde(rename = "white")]
    White,
    #[serde(rename = "black")]
    Black,
}

impl Seat {
    /// The opposing seat of the same game.
    pub fn complement(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Seat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" | "x" => Ok(Self::X),
            "O" | "o" => Ok(Self::O),
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown seat {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// The result of a finished round: a draw or the winning seat.
///
/// On the wire this is a single string: `"draw"`, `"X"`, `"O"`, `"white"`
/// or `"black"`. A room with no result yet carries `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Winner {
    Draw,
    Seat(Seat),
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => f.write_str("draw"),
            Self::Seat(seat) => seat.fmt(f),
        }
    }
}

impl TryFrom<String> for Winner {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "draw" {
            return Ok(Self::Draw);
        }
        value.parse().map(Self::Seat)
    }
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        winner.to_string()
    }
}

// ---------------------------------------------------------------------------
// PresenceAction
// ---------------------------------------------------------------------------

/// Liveness signal carried by `presence` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Connect,
    Disconnect,
}

// =========================================================================
// Tests
// =========================================================================
