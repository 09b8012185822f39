//! Relay event taxonomy.
//!
//! These are the frames participants publish to each other through the
//! realtime relay. The relay itself never decodes them (it forwards bytes),
//! so the types are generic over the room document `R` and move payload
//! `M`; only clients, which know their game, pick concrete types.
//!
//! ```text
//! {type:"joined",   roomId, player, occupants}        gateway greeting
//! {type:"room",     clientId, room}                   full-state replace
//! {type:"move",     clientId, player, seat, move, room}
//! {type:"reset",    clientId, room}                   after finish()
//! {type:"presence", clientId, action}                 broker backend only
//! ```

use serde::{Deserialize, Serialize};

use crate::{ClientId, PresenceAction, ProtocolError, RoomCode, Seat};

/// One relay frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum RelayEvent<R, M> {
    /// Sent by the fan-out gateway to a session right after it attaches.
    Joined {
        room_id: RoomCode,
        player: String,
        occupants: Vec<String>,
    },

    /// Full-state replace.
    Room { client_id: ClientId, room: R },

    /// A move was accepted. `room` is the complete post-move snapshot, so
    /// a receiver that missed earlier events still converges.
    Move {
        client_id: ClientId,
        player: String,
        seat: Seat,
        #[serde(rename = "move")]
        mv: M,
        room: R,
    },

    /// A round was finished and the room reset for the next one.
    Reset { client_id: ClientId, room: R },

    /// A session connected to or left the room's topic namespace.
    Presence {
        client_id: ClientId,
        action: PresenceAction,
    },
}

impl<R, M> RelayEvent<R, M> {
    /// The sending session, if the event has one. Gateway greetings
    /// originate from the server and carry none.
    pub fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::Joined { .. } => None,
            Self::Room { client_id, .. }
            | Self::Move { client_id, .. }
            | Self::Reset { client_id, .. }
            | Self::Presence { client_id, .. } => Some(client_id),
        }
    }

    /// The room snapshot carried by the event, if any.
    pub fn room(&self) -> Option<&R> {
        match self {
            Self::Room { room, .. } | Self::Move { room, .. } | Self::Reset { room, .. } => {
                Some(room)
            }
            Self::Joined { .. } | Self::Presence { .. } => None,
        }
    }
}

/// The game-independent head of a relay frame.
///
/// Decoding just these two fields lets a receiver recognize its own echo
/// (or an event type it doesn't handle) without decoding the room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

impl EventHeader {
    /// Reads the header of a raw frame.
    ///
    /// # Errors
    /// `ProtocolError::Decode` if the frame is not a JSON object with a
    /// string `type` field.
    pub fn peek(frame: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(frame).map_err(ProtocolError::Decode)
    }
}
