//! The room store contract and its in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use duel_protocol::{GameType, RoomCode, Seat, Winner};
use tokio::sync::RwLock;

use crate::{Player, Room, RoomError, now_millis};

/// A partial update to a room document. `None` fields are left alone.
///
/// `winner` and `last_move_by` are nullable document fields, so they are
/// doubly optional: `Some(None)` clears them.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomPatch<B> {
    pub players: Option<Vec<Player>>,
    pub board: Option<B>,
    pub turn: Option<Seat>,
    pub round_index: Option<u64>,
    pub winner: Option<Option<Winner>>,
    pub last_move_by: Option<Option<String>>,
}

impl<B> Default for RoomPatch<B> {
    fn default() -> Self {
        Self {
            players: None,
            board: None,
            turn: None,
            round_index: None,
            winner: None,
            last_move_by: None,
        }
    }
}

impl<B> RoomPatch<B> {
    /// Writes the set fields into `room` and stamps `updated_at`.
    pub fn apply_to(self, room: &mut Room<B>) {
        if let Some(players) = self.players {
            room.players = players;
        }
        if let Some(board) = self.board {
            room.board = board;
        }
        if let Some(turn) = self.turn {
            room.turn = turn;
        }
        if let Some(round_index) = self.round_index {
            room.round_index = round_index;
        }
        if let Some(winner) = self.winner {
            room.winner = winner;
        }
        if let Some(last_move_by) = self.last_move_by {
            room.last_move_by = last_move_by;
        }
        room.updated_at = now_millis();
    }
}

/// Persistence for room documents, keyed by `(gameType, roomId)`.
///
/// Writes are last-writer-wins on the whole document; there is no
/// compare-and-swap. Every method can fail with [`RoomError::Store`].
pub trait RoomStore<B>: Send + Sync + 'static {
    fn get(
        &self,
        game_type: GameType,
        room_id: &RoomCode,
    ) -> impl Future<Output = Result<Option<Room<B>>, RoomError>> + Send;

    /// Creates or replaces the whole document.
    fn put(&self, room: Room<B>) -> impl Future<Output = Result<Room<B>, RoomError>> + Send;

    /// Applies a patch to an existing document and returns the result.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if there is no such room.
    fn update(
        &self,
        game_type: GameType,
        room_id: &RoomCode,
        patch: RoomPatch<B>,
    ) -> impl Future<Output = Result<Room<B>, RoomError>> + Send;

    /// Every room of one game, in no particular order.
    fn list(
        &self,
        game_type: GameType,
    ) -> impl Future<Output = Result<Vec<Room<B>>, RoomError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryRoomStore
// ---------------------------------------------------------------------------

/// A process-local [`RoomStore`].
///
/// It can be switched offline with [`set_available`](Self::set_available)
/// to exercise store-failure paths.
pub struct MemoryRoomStore<B> {
    rooms: RwLock<HashMap<(GameType, RoomCode), Room<B>>>,
    offline: AtomicBool,
}

impl<B> MemoryRoomStore<B> {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// While unavailable, every operation fails with [`RoomError::Store`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::Relaxed);
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    fn check_online(&self) -> Result<(), RoomError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(RoomError::Store("memory store is offline".into()));
        }
        Ok(())
    }
}

impl<B> Default for MemoryRoomStore<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> RoomStore<B> for MemoryRoomStore<B>
where
    B: Clone + Send + Sync + 'static,
{
    async fn get(
        &self,
        game_type: GameType,
        room_id: &RoomCode,
    ) -> Result<Option<Room<B>>, RoomError> {
        self.check_online()?;
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&(game_type, room_id.clone())).cloned())
    }

    async fn put(&self, room: Room<B>) -> Result<Room<B>, RoomError> {
        self.check_online()?;
        let key = (room.game_type, room.room_id.clone());
        self.rooms.write().await.insert(key, room.clone());
        Ok(room)
    }

    async fn update(
        &self,
        game_type: GameType,
        room_id: &RoomCode,
        patch: RoomPatch<B>,
    ) -> Result<Room<B>, RoomError> {
        self.check_online()?;
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(&(game_type, room_id.clone()))
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        patch.apply_to(room);
        Ok(room.clone())
    }

    async fn list(&self, game_type: GameType) -> Result<Vec<Room<B>>, RoomError> {
        self.check_online()?;
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|room| room.game_type == game_type)
            .cloned()
            .collect())
    }
}
