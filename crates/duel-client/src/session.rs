//! The client reconciliation loop.
//!
//! A [`ClientSession`] keeps one participant's local copy of the room in
//! step with the authority and with the other participant:
//!
//! ```text
//!   local action ──→ precheck ──→ ActionApi ──→ adopt reply ──→ publish
//!                      │                           (authoritative snapshot)
//!                      ╰─ fail fast, nothing sent
//!
//!   relay frame ──→ own clientId? ──yes──→ drop
//!                        │ no
//!                        ▼
//!                overwrite local snapshot (last writer wins)
//! ```
//!
//! The local snapshot only ever holds what the authority returned or a
//! peer published. An action that fails keeps the last-known-good
//! snapshot; nothing is applied optimistically.

use duel_protocol::{
    ActionReply, ActionRequest, ClientId, Codec, EventHeader, JsonCodec, PresenceAction,
    RelayEvent, RoomCode, Seat,
};
use duel_relay::{PresenceReaction, PresenceRoster};
use duel_room::{GameRules, Room, RoomError};

use crate::link::presence_frame;
use crate::{ActionApi, ClientError, RelayLink};

/// Where "the room is full" comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fullness {
    /// Seated players in the stored room (fan-out gateway deployments).
    Roster,
    /// Live sessions seen through presence events (broker deployments).
    Presence,
}

/// What [`ClientSession::apply_frame`] did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The frame was this session's own echo and was dropped.
    OwnEcho,
    /// The carried room replaced the local snapshot.
    Snapshot,
    /// A presence event updated the roster.
    Presence { reannounced: bool },
    /// The gateway's greeting, listing the attached sessions.
    Joined { occupants: Vec<String> },
}

type Event<G> = RelayEvent<Room<<G as GameRules>::Board>, <G as GameRules>::Move>;

/// One participant's view of one room.
pub struct ClientSession<G: GameRules, A, L> {
    rules: G,
    api: A,
    relay: Option<L>,
    client_id: ClientId,
    player: String,
    avatar: Option<String>,
    fullness: Fullness,
    max_players: usize,
    roster: PresenceRoster,
    room: Option<Room<G::Board>>,
}

impl<G, A, L> ClientSession<G, A, L>
where
    G: GameRules,
    A: ActionApi<G::Board>,
    L: RelayLink,
{
    /// A new session with a freshly generated client id.
    pub fn new(rules: G, api: A, player: &str, fullness: Fullness) -> Self {
        Self::with_client_id(rules, api, player, fullness, ClientId::generate())
    }

    pub fn with_client_id(
        rules: G,
        api: A,
        player: &str,
        fullness: Fullness,
        client_id: ClientId,
    ) -> Self {
        Self {
            rules,
            api,
            relay: None,
            roster: PresenceRoster::new(client_id.clone()),
            client_id,
            player: player.trim().to_string(),
            avatar: None,
            fullness,
            max_players: 2,
            room: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Starts publishing through `link`. Attach before [`join`](Self::join)
    /// so the occupant already in the room learns about the join.
    pub fn attach_relay(&mut self, link: L) {
        self.relay = Some(link);
    }

    pub fn relay(&self) -> Option<&L> {
        self.relay.as_ref()
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// The local snapshot.
    pub fn room(&self) -> Option<&Room<G::Board>> {
        self.room.as_ref()
    }

    /// This player's seat in the local snapshot.
    pub fn seat(&self) -> Option<Seat> {
        self.room.as_ref().and_then(|room| room.seat_of(&self.player))
    }

    /// Whether both seats are taken, judged by this session's
    /// [`Fullness`] source. The two sources can briefly disagree.
    pub fn is_room_full(&self) -> bool {
        match self.fullness {
            Fullness::Roster => self
                .room
                .as_ref()
                .is_some_and(|room| room.is_full(self.max_players)),
            Fullness::Presence => self.roster.live_count() >= self.max_players,
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Creates (or re-creates) a room and publishes it.
    pub async fn create(&mut self, room_id: Option<&str>) -> Result<&Room<G::Board>, ClientError> {
        let request =
            self.with_avatar_of(ActionRequest::create(G::GAME_TYPE, room_id, &self.player));
        let room = self.perform(request).await?;
        self.publish_room(|client_id, room| RelayEvent::Room { client_id, room }, room)
            .await
    }

    /// Joins a room and publishes it.
    pub async fn join(&mut self, room_id: &str) -> Result<&Room<G::Board>, ClientError> {
        let request = self.with_avatar_of(ActionRequest::join(G::GAME_TYPE, room_id, &self.player));
        let room = self.perform(request).await?;
        self.publish_room(|client_id, room| RelayEvent::Room { client_id, room }, room)
            .await
    }

    /// Plays a move after the same checks the server makes, and publishes
    /// it with the resulting room.
    pub async fn play(&mut self, mv: G::Move) -> Result<&Room<G::Board>, ClientError> {
        let (room_id, seat) = self.precheck(&mv)?;
        let request = ActionRequest::play(G::GAME_TYPE, room_id.as_str(), &self.player, &mv)?;
        let room = self.perform(request).await?;

        let player = self.player.clone();
        self.publish_room(
            move |client_id, room| RelayEvent::Move {
                client_id,
                player,
                seat,
                mv,
                room,
            },
            room,
        )
        .await
    }

    /// Ends the round and publishes the reset room.
    pub async fn finish(&mut self) -> Result<&Room<G::Board>, ClientError> {
        let room_id = self.room.as_ref().ok_or(ClientError::NoRoom)?.room_id.clone();
        let room = self
            .perform(ActionRequest::finish(G::GAME_TYPE, room_id.as_str()))
            .await?;
        self.publish_room(|client_id, room| RelayEvent::Reset { client_id, room }, room)
            .await
    }

    /// Re-reads the room from the authority. Nothing is published.
    pub async fn refresh(&mut self) -> Result<&Room<G::Board>, ClientError> {
        let room_id = self.room.as_ref().ok_or(ClientError::NoRoom)?.room_id.clone();
        let room = self
            .perform(ActionRequest::get(G::GAME_TYPE, room_id.as_str()))
            .await?;
        Ok(self.room.insert(room))
    }

    // -----------------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------------

    /// Folds one inbound relay frame into local state.
    ///
    /// # Errors
    /// [`ClientError::Protocol`] if the frame doesn't decode. The local
    /// snapshot is left alone in that case.
    pub async fn apply_frame(&mut self, frame: &[u8]) -> Result<Applied, ClientError> {
        let header = EventHeader::peek(frame)?;
        if header.client_id.as_ref() == Some(&self.client_id) {
            tracing::debug!(kind = %header.kind, "dropping own echo");
            return Ok(Applied::OwnEcho);
        }

        let event: Event<G> = JsonCodec.decode(frame)?;
        match event {
            RelayEvent::Room { room, .. }
            | RelayEvent::Move { room, .. }
            | RelayEvent::Reset { room, .. } => {
                self.room = Some(room);
                Ok(Applied::Snapshot)
            }
            RelayEvent::Presence { client_id, action } => {
                let reannounced = match self.roster.observe(&client_id, action) {
                    PresenceReaction::Reannounce => {
                        self.send(presence_frame(&self.client_id, PresenceAction::Connect)?)
                            .await;
                        true
                    }
                    PresenceReaction::None => false,
                };
                tracing::debug!(
                    peer = %client_id,
                    ?action,
                    live = self.roster.live_count(),
                    "presence"
                );
                Ok(Applied::Presence { reannounced })
            }
            RelayEvent::Joined { occupants, .. } => Ok(Applied::Joined { occupants }),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn with_avatar_of(&self, request: ActionRequest) -> ActionRequest {
        match &self.avatar {
            Some(avatar) => request.with_avatar(avatar.clone()),
            None => request,
        }
    }

    /// Mirrors the arbiter's order: seated, not terminal, on turn, then
    /// the board check.
    fn precheck(&self, mv: &G::Move) -> Result<(RoomCode, Seat), ClientError> {
        let room = self.room.as_ref().ok_or(ClientError::NoRoom)?;
        let seat = room.seat_of(&self.player).ok_or_else(|| {
            RoomError::InvalidMove(format!("{} has no seat in room {}", self.player, room.room_id))
        })?;
        if room.winner.is_some() {
            return Err(RoomError::TerminalState(room.room_id.clone()).into());
        }
        if room.turn != seat {
            return Err(RoomError::TurnViolation {
                expected: room.turn,
                actual: seat,
            }
            .into());
        }
        self.rules.precheck(&room.board, mv)?;
        Ok((room.room_id.clone(), seat))
    }

    /// Sends a request and unwraps the room it returns. On any failure the
    /// local snapshot stays as it was.
    async fn perform(&self, request: ActionRequest) -> Result<Room<G::Board>, ClientError> {
        let action = request.action;
        match self.api.perform(request).await {
            Ok(ActionReply::Room { room, .. }) | Ok(ActionReply::Snapshot { room }) => Ok(room),
            Ok(ActionReply::Failure { error }) => {
                tracing::debug!(
                    ?action,
                    code = error.code,
                    message = %error.message,
                    "action rejected"
                );
                Err(ClientError::Rejected(error))
            }
            Ok(ActionReply::Listing { .. }) => Err(ClientError::UnexpectedReply(format!(
                "room listing in reply to {action:?}"
            ))),
            Err(e) => {
                tracing::warn!(?action, error = %e, "action failed, keeping last known room");
                Err(e)
            }
        }
    }

    /// Adopts `room` as local truth, then publishes the event built
    /// around it.
    async fn publish_room<F>(
        &mut self,
        build: F,
        room: Room<G::Board>,
    ) -> Result<&Room<G::Board>, ClientError>
    where
        F: FnOnce(ClientId, Room<G::Board>) -> Event<G>,
    {
        let event = build(self.client_id.clone(), room.clone());
        match JsonCodec.encode(&event) {
            Ok(frame) => self.send(frame).await,
            Err(e) => tracing::warn!(error = %e, "relay event not encodable"),
        }
        Ok(self.room.insert(room))
    }

    /// Publishes a frame if a relay is attached. Failures are logged and
    /// dropped.
    async fn send(&self, frame: Vec<u8>) {
        let Some(relay) = &self.relay else {
            return;
        };
        if let Err(e) = relay.publish(frame).await {
            tracing::debug!(client_id = %self.client_id, error = %e, "relay publish failed");
        }
    }
}
