//! WebSocket endpoints and how their request targets are spelled.
//!
//! ```text
//! /actions                                   action request/reply
//! /relay/{roomId}?name={name}                fan-out gateway
//! /broker/{roomId}?clientId={id}&name={name} topic broker
//! ```
//!
//! Query values are percent-encoded, so display names may contain spaces
//! or any other characters.

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::{ClientId, ProtocolError, RoomCode};

/// A parsed upgrade request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Actions,
    Relay {
        room_id: RoomCode,
        name: String,
    },
    Broker {
        room_id: RoomCode,
        client_id: ClientId,
        name: String,
    },
}

impl Endpoint {
    /// Parses a request target such as `/relay/AB12CD?name=alice`.
    ///
    /// # Errors
    /// - `UnknownEndpoint` for any other path.
    /// - `InvalidRoomCode` if the room segment doesn't normalize.
    /// - `InvalidMessage` if the broker endpoint has no `clientId`.
    pub fn parse(target: &str) -> Result<Self, ProtocolError> {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            ["actions"] => Ok(Self::Actions),
            ["relay", room] => Ok(Self::Relay {
                room_id: RoomCode::parse(room)?,
                name: query_value(query, "name").unwrap_or_default(),
            }),
            ["broker", room] => {
                let client_id = query_value(query, "clientId")
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        ProtocolError::InvalidMessage("broker endpoint needs a clientId".into())
                    })?;
                Ok(Self::Broker {
                    room_id: RoomCode::parse(room)?,
                    client_id: ClientId::from(client_id),
                    name: query_value(query, "name").unwrap_or_default(),
                })
            }
            _ => Err(ProtocolError::UnknownEndpoint(target.to_string())),
        }
    }

    /// The request target for this endpoint.
    pub fn target(&self) -> String {
        match self {
            Self::Actions => "/actions".to_string(),
            Self::Relay { room_id, name } => {
                format!("/relay/{room_id}?name={}", encode(name))
            }
            Self::Broker {
                room_id,
                client_id,
                name,
            } => format!(
                "/broker/{room_id}?clientId={}&name={}",
                encode(client_id.as_str()),
                encode(name)
            ),
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// First value of `key` in a query string, percent-decoded. Values that
/// don't decode to UTF-8 are treated as absent.
fn query_value(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| percent_decode_str(v).decode_utf8().ok())
        .map(|v| v.into_owned())
}
