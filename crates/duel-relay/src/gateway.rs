//! Backend A: the direct fan-out gateway.
//!
//! The gateway is a process-wide registry from room code to the sessions
//! attached to that room. A frame published by one session is forwarded
//! verbatim to every *other* session of the same room; the gateway never
//! decodes it.
//!
//! ## Registry lifecycle
//!
//! ```text
//! attach() ──→ entry created on first session
//!    │
//!    ▼
//! forward() ──→ fan-out to the room's other sessions
//!    │
//!    ▼
//! detach() ──→ session removed, room entry deleted when empty
//! ```
//!
//! The registry is a sharded concurrent map, so connection tasks on any
//! runtime thread can attach, forward and detach without a global lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use duel_protocol::{Codec, JsonCodec, RelayEvent, RoomCode};
use tokio::sync::mpsc;

use crate::RelayError;

/// Channel a relay delivers raw frames through.
pub type FrameSender = mpsc::UnboundedSender<Vec<u8>>;

/// Identifies one attached session within the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

struct Attached {
    name: String,
    outbox: FrameSender,
}

/// The room → sessions registry.
#[derive(Default)]
pub struct RelayGateway {
    rooms: DashMap<RoomCode, DashMap<SessionId, Attached>>,
    next_id: AtomicU64,
}

impl RelayGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a session to a room and greets it.
    ///
    /// The attaching session (and only it) receives
    /// `{type:"joined", roomId, player, occupants}` with the names of all
    /// sessions now in the room, itself included, in attach order. The
    /// returned guard detaches the session when dropped.
    ///
    /// # Errors
    /// [`RelayError::Protocol`] if the greeting can't be encoded; the
    /// session is not attached in that case.
    pub fn attach(
        self: &Arc<Self>,
        room_id: RoomCode,
        name: &str,
        outbox: FrameSender,
    ) -> Result<Attachment, RelayError> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let occupants = {
            let sessions = self.rooms.entry(room_id.clone()).or_default();
            sessions.insert(
                id,
                Attached {
                    name: name.to_string(),
                    outbox: outbox.clone(),
                },
            );
            occupant_names(&sessions)
        };

        let greeting: RelayEvent<(), ()> = RelayEvent::Joined {
            room_id: room_id.clone(),
            player: name.to_string(),
            occupants,
        };
        let frame = match JsonCodec.encode(&greeting) {
            Ok(frame) => frame,
            Err(e) => {
                self.detach(&room_id, id);
                return Err(e.into());
            }
        };
        if outbox.send(frame).is_err() {
            tracing::debug!(%room_id, %id, "attaching session closed before greeting");
        }

        tracing::info!(%room_id, %id, player = %name, "session attached");
        Ok(Attachment {
            gateway: Arc::clone(self),
            room_id,
            id,
        })
    }

    /// Sends `frame` to every session of the room except `from`. Returns
    /// how many sessions it reached.
    pub fn forward(&self, room_id: &RoomCode, from: SessionId, frame: &[u8]) -> usize {
        let Some(sessions) = self.rooms.get(room_id) else {
            return 0;
        };
        let mut delivered = 0;
        for entry in sessions.iter() {
            if *entry.key() == from {
                continue;
            }
            match entry.value().outbox.send(frame.to_vec()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(%room_id, to = %entry.key(), "relay delivery failed, skipping");
                }
            }
        }
        delivered
    }

    /// Removes a session; drops the room entry if it was the last one.
    pub fn detach(&self, room_id: &RoomCode, id: SessionId) {
        let removed = self
            .rooms
            .get(room_id)
            .and_then(|sessions| sessions.remove(&id));
        self.rooms.remove_if(room_id, |_, sessions| sessions.is_empty());
        if removed.is_some() {
            tracing::info!(%room_id, %id, "session detached");
        }
    }

    /// Names of the sessions attached to a room, in attach order.
    pub fn occupants(&self, room_id: &RoomCode) -> Vec<String> {
        self.rooms
            .get(room_id)
            .map(|sessions| occupant_names(&sessions))
            .unwrap_or_default()
    }

    /// Number of rooms with at least one attached session.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn occupant_names(sessions: &DashMap<SessionId, Attached>) -> Vec<String> {
    let mut named: Vec<(SessionId, String)> = sessions
        .iter()
        .map(|entry| (*entry.key(), entry.value().name.clone()))
        .collect();
    named.sort_by_key(|(id, _)| *id);
    named.into_iter().map(|(_, name)| name).collect()
}

/// A session's membership in a gateway room.
///
/// Dropping it detaches the session, so a connection task that ends for
/// any reason (clean close, error, panic) leaves the registry clean.
pub struct Attachment {
    gateway: Arc<RelayGateway>,
    room_id: RoomCode,
    id: SessionId,
}

impl Attachment {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn room_id(&self) -> &RoomCode {
        &self.room_id
    }

    /// Forwards a frame from this session to the rest of its room.
    pub fn forward(&self, frame: &[u8]) -> usize {
        self.gateway.forward(&self.room_id, self.id, frame)
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.gateway.detach(&self.room_id, self.id);
    }
}
