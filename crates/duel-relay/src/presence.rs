//! Client-side presence tracking for the broker backend.

use std::collections::HashSet;

use duel_protocol::{ClientId, PresenceAction};

/// What a session should do after observing a presence event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceReaction {
    /// Nothing to do.
    None,
    /// A session we hadn't seen connected; publish our own `connect` again
    /// so it learns about us.
    Reannounce,
}

/// The set of live sessions in a room, as seen by one session.
///
/// The owner counts as live from the start. Presence is about sessions,
/// not players: one player with two tabs open is two entries.
#[derive(Debug, Clone)]
pub struct PresenceRoster {
    me: ClientId,
    live: HashSet<ClientId>,
}

impl PresenceRoster {
    pub fn new(me: ClientId) -> Self {
        let live = HashSet::from([me.clone()]);
        Self { me, live }
    }

    /// Records a presence event from another session.
    ///
    /// A `connect` from an untracked session asks for exactly one
    /// re-announce. The peer's own re-announce then arrives as a `connect`
    /// from a tracked session, which asks for nothing, so the exchange
    /// ends after one round trip.
    pub fn observe(&mut self, client_id: &ClientId, action: PresenceAction) -> PresenceReaction {
        if *client_id == self.me {
            return PresenceReaction::None;
        }
        match action {
            PresenceAction::Connect => {
                if self.live.insert(client_id.clone()) {
                    PresenceReaction::Reannounce
                } else {
                    PresenceReaction::None
                }
            }
            PresenceAction::Disconnect => {
                self.live.remove(client_id);
                PresenceReaction::None
            }
        }
    }

    /// Live sessions, the owner included.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, client_id: &ClientId) -> bool {
        self.live.contains(client_id)
    }
}
