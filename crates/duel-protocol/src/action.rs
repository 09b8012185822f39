//! The action surface: request and reply frames for room operations.
//!
//! Every room operation uses the same request shape regardless of game:
//!
//! ```json
//! { "action": "move", "gameType": "tictactoe", "roomId": "AB12CD",
//!   "playerName": "alice", "move": { "row": 0, "col": 2 } }
//! ```
//!
//! The `move` payload is opaque at this layer. Only the game rules know
//! whether it is a cell (`{row, col}`) or a chess move (`{from, to}`), so it
//! stays a [`serde_json::Value`] until the server has picked the rules for
//! `gameType`.

use serde::{Deserialize, Serialize};

use crate::{GameType, ProtocolError, RoomCode};

/// Which operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Join,
    Move,
    Finish,
    Get,
    List,
}

/// A single request frame on the action endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: Action,
    pub game_type: GameType,

    /// Raw room code as typed by the user; normalized by the server.
    /// Optional for `create` (a fresh code is generated) and `list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Game-specific move payload, only meaningful for `move`.
    #[serde(default, rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<serde_json::Value>,

    /// `list` only: keep rooms with recent activity.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub online: bool,

    /// `list` only: cap on the number of rooms returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ActionRequest {
    fn new(action: Action, game_type: GameType) -> Self {
        Self {
            action,
            game_type,
            room_id: None,
            player_name: None,
            avatar: None,
            mv: None,
            online: false,
            limit: None,
        }
    }

    /// `create`, with an explicit code or `None` to have one generated.
    pub fn create(game_type: GameType, room_id: Option<&str>, player_name: &str) -> Self {
        Self {
            room_id: room_id.map(str::to_string),
            player_name: Some(player_name.to_string()),
            ..Self::new(Action::Create, game_type)
        }
    }

    pub fn join(game_type: GameType, room_id: &str, player_name: &str) -> Self {
        Self {
            room_id: Some(room_id.to_string()),
            player_name: Some(player_name.to_string()),
            ..Self::new(Action::Join, game_type)
        }
    }

    /// `move`, serializing the game-specific move payload.
    ///
    /// # Errors
    /// `ProtocolError::Encode` if the move can't be represented as JSON.
    pub fn play<M: Serialize>(
        game_type: GameType,
        room_id: &str,
        player_name: &str,
        mv: &M,
    ) -> Result<Self, ProtocolError> {
        let mv = serde_json::to_value(mv).map_err(ProtocolError::Encode)?;
        Ok(Self {
            room_id: Some(room_id.to_string()),
            player_name: Some(player_name.to_string()),
            mv: Some(mv),
            ..Self::new(Action::Move, game_type)
        })
    }

    pub fn finish(game_type: GameType, room_id: &str) -> Self {
        Self {
            room_id: Some(room_id.to_string()),
            ..Self::new(Action::Finish, game_type)
        }
    }

    pub fn get(game_type: GameType, room_id: &str) -> Self {
        Self {
            room_id: Some(room_id.to_string()),
            ..Self::new(Action::Get, game_type)
        }
    }

    pub fn list(game_type: GameType, online: bool, limit: Option<usize>) -> Self {
        Self {
            online,
            limit,
            ..Self::new(Action::List, game_type)
        }
    }

    /// Sets the optional avatar on a `create`/`join` request.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// The normalized room code.
    ///
    /// # Errors
    /// `InvalidMessage` if the request carries no `roomId`, or
    /// `InvalidRoomCode` if it doesn't normalize.
    pub fn room_code(&self) -> Result<RoomCode, ProtocolError> {
        let raw = self.room_id.as_deref().ok_or_else(|| {
            ProtocolError::InvalidMessage("roomId is required".into())
        })?;
        RoomCode::parse(raw)
    }

    /// The acting player's display name, trimmed.
    ///
    /// # Errors
    /// `InvalidMessage` if the name is missing or blank.
    pub fn player(&self) -> Result<&str, ProtocolError> {
        match self.player_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ProtocolError::InvalidMessage(
                "playerName is required".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Rejection details, with an HTTP-style `code` (400, 403, 404, 503).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub code: u16,
    pub message: String,
}

/// A reply frame on the action endpoint.
///
/// `R` is the room document type. The enum is untagged, so the JSON looks
/// exactly like the documented shapes: `{roomId, room}`, `{room}`,
/// `{rooms}`, or `{error: {code, message}}`. Variant order matters for
/// decoding: the `{roomId, room}` shape must be tried before `{room}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionReply<R> {
    /// Reply to `create`, `join`, `move` and `finish`.
    Room {
        #[serde(rename = "roomId")]
        room_id: RoomCode,
        room: R,
    },
    /// Reply to `get`.
    Snapshot { room: R },
    /// Reply to `list`.
    Listing { rooms: Vec<R> },
    /// Any rejected request.
    Failure { error: ActionFailure },
}

impl<R> ActionReply<R> {
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self::Failure {
            error: ActionFailure {
                code,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_uses_camel_case_and_move_key() {
        let req = ActionRequest::play(
            GameType::TicTacToe,
            "ab12cd",
            "alice",
            &json!({"row": 0, "col": 2}),
        )
        .unwrap();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["action"], "move");
        assert_eq!(value["gameType"], "tictactoe");
        assert_eq!(value["roomId"], "ab12cd");
        assert_eq!(value["playerName"], "alice");
        assert_eq!(value["move"]["col"], 2);
        assert!(value.get("online").is_none());
    }

    #[test]
    fn test_request_decodes_minimal_frame() {
        let req: ActionRequest =
            serde_json::from_str(r#"{"action":"list","gameType":"chess"}"#)
                .unwrap();
        assert_eq!(req.action, Action::List);
        assert!(!req.online);
        assert!(req.room_id.is_none());
    }

    #[test]
    fn test_room_code_required_and_normalized() {
        let req = ActionRequest::get(GameType::Chess, " ab12cd");
        assert_eq!(req.room_code().unwrap().as_str(), "AB12CD");

        let req = ActionRequest::list(GameType::Chess, false, None);
        assert!(matches!(
            req.room_code(),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_player_rejects_blank_name() {
        let req = ActionRequest::join(GameType::Chess, "AB", "   ");
        assert!(req.player().is_err());
        let req = ActionRequest::join(GameType::Chess, "AB", " bob ");
        assert_eq!(req.player().unwrap(), "bob");
    }

    #[test]
    fn test_reply_shapes() {
        let reply: ActionReply<serde_json::Value> = ActionReply::Room {
            room_id: RoomCode::parse("AB").unwrap(),
            room: json!({"k": 1}),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"roomId": "AB", "room": {"k": 1}})
        );

        let failure: ActionReply<serde_json::Value> =
            ActionReply::failure(404, "room AB not found");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"error": {"code": 404, "message": "room AB not found"}})
        );
    }

    #[test]
    fn test_reply_decodes_each_shape() {
        let r: ActionReply<u32> =
            serde_json::from_str(r#"{"roomId":"ab","room":1}"#).unwrap();
        assert!(matches!(r, ActionReply::Room { room: 1, .. }));

        let r: ActionReply<u32> = serde_json::from_str(r#"{"room":2}"#).unwrap();
        assert!(matches!(r, ActionReply::Snapshot { room: 2 }));

        let r: ActionReply<u32> =
            serde_json::from_str(r#"{"rooms":[1,2]}"#).unwrap();
        assert!(matches!(r, ActionReply::Listing { rooms } if rooms == vec![1, 2]));

        let r: ActionReply<u32> =
            serde_json::from_str(r#"{"error":{"code":403,"message":"full"}}"#)
                .unwrap();
        assert!(matches!(r, ActionReply::Failure { error } if error.code == 403));
    }
}
