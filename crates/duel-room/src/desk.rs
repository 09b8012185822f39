//! The action surface for one game: turns an [`ActionRequest`] into an
//! [`ActionReply`].

use std::sync::Arc;

use duel_protocol::{Action, ActionReply, ActionRequest, ProtocolError};

use crate::{
    GameRules, ListFilter, MoveArbiter, Room, RoomConfig, RoomError, RoomLifecycle, RoomStore,
};

/// Lifecycle manager and move arbiter for one game, behind the uniform
/// request/reply shape.
pub struct ActionDesk<G: GameRules, S> {
    lifecycle: RoomLifecycle<G, S>,
    arbiter: MoveArbiter<G, S>,
}

impl<G: GameRules, S> Clone for ActionDesk<G, S> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            arbiter: self.arbiter.clone(),
        }
    }
}

impl<G, S> ActionDesk<G, S>
where
    G: GameRules,
    S: RoomStore<G::Board>,
{
    pub fn new(rules: Arc<G>, store: Arc<S>, config: RoomConfig) -> Self {
        Self {
            lifecycle: RoomLifecycle::new(Arc::clone(&rules), Arc::clone(&store), config),
            arbiter: MoveArbiter::new(rules, store),
        }
    }

    pub fn lifecycle(&self) -> &RoomLifecycle<G, S> {
        &self.lifecycle
    }

    pub fn arbiter(&self) -> &MoveArbiter<G, S> {
        &self.arbiter
    }

    /// Runs one request. Failures become `{error: {code, message}}`.
    pub async fn handle(&self, request: &ActionRequest) -> ActionReply<Room<G::Board>> {
        match self.dispatch(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(action = ?request.action, error = %e, "action rejected");
                ActionReply::failure(e.status_code(), e.to_string())
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ActionRequest,
    ) -> Result<ActionReply<Room<G::Board>>, RoomError> {
        if request.game_type != G::GAME_TYPE {
            return Err(RoomError::Malformed(format!(
                "{} request sent to the {} desk",
                request.game_type,
                G::GAME_TYPE
            )));
        }

        let room = match request.action {
            Action::Create => {
                let room_id = match request.room_id.as_deref() {
                    Some(raw) if !raw.trim().is_empty() => Some(request.room_code()?),
                    _ => None,
                };
                self.lifecycle
                    .create(room_id, request.player()?, request.avatar.clone())
                    .await?
            }
            Action::Join => {
                self.lifecycle
                    .join(&request.room_code()?, request.player()?, request.avatar.clone())
                    .await?
            }
            Action::Move => {
                let room_id = request.room_code()?;
                let player = request.player()?;
                let mv = match decode_move::<G>(request) {
                    Ok(mv) => mv,
                    Err(e) => {
                        // A missing room outranks a bad payload.
                        self.lifecycle.get(&room_id).await?;
                        return Err(e.into());
                    }
                };
                self.arbiter.submit_move(&room_id, player, &mv).await?
            }
            Action::Finish => self.lifecycle.finish(&request.room_code()?).await?,
            Action::Get => {
                let room = self.lifecycle.get(&request.room_code()?).await?;
                return Ok(ActionReply::Snapshot { room });
            }
            Action::List => {
                let filter = ListFilter {
                    online: request.online,
                    limit: request.limit,
                };
                let rooms = self.lifecycle.list(filter).await?;
                return Ok(ActionReply::Listing { rooms });
            }
        };

        Ok(ActionReply::Room {
            room_id: room.room_id.clone(),
            room,
        })
    }
}

fn decode_move<G: GameRules>(request: &ActionRequest) -> Result<G::Move, ProtocolError> {
    let raw = request
        .mv
        .clone()
        .ok_or_else(|| ProtocolError::InvalidMessage("move action without a move".into()))?;
    serde_json::from_value(raw).map_err(ProtocolError::Decode)
}
