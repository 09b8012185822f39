//! Room lifecycle: create, join, finish, get and list.

use std::sync::Arc;

use duel_protocol::RoomCode;

use crate::{GameRules, Player, Room, RoomConfig, RoomError, RoomPatch, RoomStore, now_millis};

/// Options for [`RoomLifecycle::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only rooms updated within the configured online window.
    pub online: bool,
    pub limit: Option<usize>,
}

/// Creates rooms, seats players and starts new rounds.
///
/// This is the entry point for room operations from the server's action
/// handler. It is cheap to clone; rules and store are shared.
pub struct RoomLifecycle<G: GameRules, S> {
    rules: Arc<G>,
    store: Arc<S>,
    config: RoomConfig,
}

impl<G: GameRules, S> Clone for RoomLifecycle<G, S> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<G, S> RoomLifecycle<G, S>
where
    G: GameRules,
    S: RoomStore<G::Board>,
{
    pub fn new(rules: Arc<G>, store: Arc<S>, config: RoomConfig) -> Self {
        Self {
            rules,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room, or re-creates it if the code is already in use.
    ///
    /// The creator is the only occupant. Re-creating keeps the old
    /// `round_index` (and so the seat parity) and `created_at`; everything
    /// else starts over. With no code, a fresh one is generated.
    pub async fn create(
        &self,
        room_id: Option<RoomCode>,
        player: &str,
        avatar: Option<String>,
    ) -> Result<Room<G::Board>, RoomError> {
        let room_id = room_id.unwrap_or_else(|| RoomCode::generate(self.config.code_length));
        let existing = self.store.get(G::GAME_TYPE, &room_id).await?;
        let now = now_millis();
        let (round_index, created_at) = existing
            .map(|room| (room.round_index, room.created_at))
            .unwrap_or((0, now));

        let seat = G::seat_for_round(round_index);
        let room = Room {
            game_type: G::GAME_TYPE,
            room_id,
            players: vec![Player::new(player, seat, avatar)],
            board: self.rules.initial_board(),
            turn: G::OPENING_SEAT,
            round_index,
            winner: None,
            last_move_by: None,
            created_at,
            updated_at: now,
        };
        let room = self.store.put(room).await?;
        tracing::info!(
            game = %G::GAME_TYPE,
            room_id = %room.room_id,
            player,
            %seat,
            round_index,
            status = ?room.status(self.config.max_players),
            "room created"
        );
        Ok(room)
    }

    /// Seats `player` opposite the current occupant.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if there is no such room.
    /// - [`RoomError::Full`] if every seat is taken, whoever is asking.
    ///
    /// A player who is already in a room that still has a free seat gets
    /// the room back unchanged.
    pub async fn join(
        &self,
        room_id: &RoomCode,
        player: &str,
        avatar: Option<String>,
    ) -> Result<Room<G::Board>, RoomError> {
        let room = self
            .store
            .get(G::GAME_TYPE, room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        if room.is_full(self.config.max_players) {
            tracing::debug!(%room_id, player, "join rejected, room full");
            return Err(RoomError::Full(room_id.clone()));
        }
        if room.has_player(player) {
            return Ok(room);
        }

        let seat = match room.players.first() {
            Some(first) => first
                .seat
                .unwrap_or_else(|| G::seat_for_round(room.round_index))
                .complement(),
            None => G::seat_for_round(room.round_index),
        };

        let mut players = room.players;
        players.push(Player::new(player, seat, avatar));
        let room = self
            .store
            .update(
                G::GAME_TYPE,
                room_id,
                RoomPatch {
                    players: Some(players),
                    ..RoomPatch::default()
                },
            )
            .await?;
        tracing::info!(
            %room_id,
            player,
            %seat,
            status = ?room.status(self.config.max_players),
            "player joined room"
        );
        Ok(room)
    }

    /// Ends the round: clears the board and result, advances
    /// `round_index`, and swaps every occupant's seat.
    pub async fn finish(&self, room_id: &RoomCode) -> Result<Room<G::Board>, RoomError> {
        let room = self
            .store
            .get(G::GAME_TYPE, room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let players = room
            .players
            .into_iter()
            .map(|p| Player {
                seat: p.seat.map(|s| s.complement()),
                ..p
            })
            .collect();
        let round_index = room.round_index + 1;

        let room = self
            .store
            .update(
                G::GAME_TYPE,
                room_id,
                RoomPatch {
                    players: Some(players),
                    board: Some(self.rules.initial_board()),
                    turn: Some(G::OPENING_SEAT),
                    round_index: Some(round_index),
                    winner: Some(None),
                    last_move_by: Some(None),
                },
            )
            .await?;
        tracing::info!(
            %room_id,
            round_index,
            status = ?room.status(self.config.max_players),
            "round finished, seats swapped"
        );
        Ok(room)
    }

    pub async fn get(&self, room_id: &RoomCode) -> Result<Room<G::Board>, RoomError> {
        self.store
            .get(G::GAME_TYPE, room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Occupied rooms, most recently updated first.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Room<G::Board>>, RoomError> {
        let window = self.config.online_window.as_millis() as u64;
        let cutoff = now_millis().saturating_sub(window);

        let mut rooms: Vec<_> = self
            .store
            .list(G::GAME_TYPE)
            .await?
            .into_iter()
            .filter(|room| !room.players.is_empty())
            .filter(|room| !filter.online || room.updated_at >= cutoff)
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = filter.limit {
            rooms.truncate(limit);
        }
        Ok(rooms)
    }
}
