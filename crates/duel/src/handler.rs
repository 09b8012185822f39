//! Per-connection handler: endpoint routing, the action loop and the two
//! relay loops.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The request target picks what the connection is for:
//!
//! - `/actions`: one reply frame per request frame.
//! - `/relay/{roomId}?name=`: fan-out gateway session.
//! - `/broker/{roomId}?clientId=&name=`: broker session with presence.
//!
//! Only the configured relay endpoint is served; the other is refused.

use std::sync::Arc;

use duel_protocol::{
    ActionReply, ActionRequest, ClientId, Codec, Endpoint, EventHeader, GameType, JsonCodec,
    PresenceAction, RelayEvent, RoomCode,
};
use duel_relay::topic::{events_topic, presence_topic, room_filter};
use duel_relay::{Broker, LastWill, RelayGateway};
use duel_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{Relay, ServerState};
use crate::DuelError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), DuelError> {
    let conn_id = conn.id();
    let endpoint = match Endpoint::parse(conn.target()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::debug!(%conn_id, target = conn.target(), error = %e, "refusing connection");
            send_failure(&conn, &state, 404, &e.to_string()).await?;
            conn.close().await?;
            return Ok(());
        }
    };
    tracing::debug!(%conn_id, ?endpoint, "handling new connection");

    match (endpoint, &state.relay) {
        (Endpoint::Actions, _) => serve_actions(&conn, &state).await,
        (Endpoint::Relay { room_id, name }, Relay::Gateway(gateway)) => {
            serve_gateway(&conn, gateway, room_id, &name).await
        }
        (Endpoint::Broker { room_id, client_id, name }, Relay::Broker(broker)) => {
            serve_broker(&conn, broker, room_id, client_id, &name).await
        }
        (endpoint, _) => {
            tracing::debug!(%conn_id, ?endpoint, "relay backend not enabled");
            send_failure(&conn, &state, 404, "relay backend not enabled on this server").await?;
            conn.close().await?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

async fn serve_actions(conn: &WebSocketConnection, state: &ServerState) -> Result<(), DuelError> {
    let conn_id = conn.id();
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "action connection closed");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "action connection idle, closing");
                conn.close().await?;
                break;
            }
        };

        let request: ActionRequest = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable action request");
                send_failure(conn, state, 400, &e.to_string()).await?;
                continue;
            }
        };
        tracing::debug!(%conn_id, action = ?request.action, game = %request.game_type, "action");

        let reply = match request.game_type {
            GameType::TicTacToe => state.codec.encode(&state.tictactoe.handle(&request).await)?,
            GameType::Chess => state.codec.encode(&state.chess.handle(&request).await)?,
        };
        conn.send(&reply).await?;
    }
    Ok(())
}

/// Sends a `{error:{code, message}}` frame.
async fn send_failure(
    conn: &WebSocketConnection,
    state: &ServerState,
    code: u16,
    message: &str,
) -> Result<(), DuelError> {
    let reply: ActionReply<()> = ActionReply::failure(code, message);
    let bytes = state.codec.encode(&reply)?;
    conn.send(&bytes).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Fan-out gateway
// ---------------------------------------------------------------------------

async fn serve_gateway(
    conn: &WebSocketConnection,
    gateway: &Arc<RelayGateway>,
    room_id: RoomCode,
    name: &str,
) -> Result<(), DuelError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    // Dropping the attachment detaches the session, however this returns.
    let attachment = gateway.attach(room_id, name, tx)?;
    let id = attachment.id();

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                conn.send(&frame).await?;
            }
            inbound = conn.recv() => match inbound {
                Ok(Some(frame)) => {
                    let delivered = attachment.forward(&frame);
                    tracing::debug!(%id, delivered, "relayed frame");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(%id, error = %e, "relay recv error");
                    break;
                }
            },
        }
    }
    tracing::info!(room_id = %attachment.room_id(), %id, "session detached");
    Ok(())
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

fn presence(client_id: &ClientId, action: PresenceAction) -> Result<Vec<u8>, DuelError> {
    let event: RelayEvent<(), ()> = RelayEvent::Presence {
        client_id: client_id.clone(),
        action,
    };
    Ok(JsonCodec.encode(&event)?)
}

async fn serve_broker(
    conn: &WebSocketConnection,
    broker: &Arc<Broker>,
    room_id: RoomCode,
    client_id: ClientId,
    name: &str,
) -> Result<(), DuelError> {
    let presence_topic = presence_topic(&room_id);
    let events_topic = events_topic(&room_id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let will = LastWill {
        topic: presence_topic.clone(),
        payload: presence(&client_id, PresenceAction::Disconnect)?,
    };
    let session = broker.connect(client_id.clone(), Some(will), tx)?;
    session.subscribe(&room_filter(&room_id))?;
    session.publish(&presence_topic, &presence(&client_id, PresenceAction::Connect)?)?;
    tracing::info!(%room_id, %client_id, player = %name, "broker session opened");

    let clean = loop {
        tokio::select! {
            Some(message) = rx.recv() => {
                if let Err(e) = conn.send(&message.payload).await {
                    tracing::debug!(%client_id, error = %e, "broker delivery failed");
                    break false;
                }
            }
            inbound = conn.recv() => match inbound {
                Ok(Some(frame)) => {
                    let topic = match EventHeader::peek(&frame) {
                        Ok(header) if header.kind == "presence" => &presence_topic,
                        _ => &events_topic,
                    };
                    let delivered = session.publish(topic, &frame)?;
                    tracing::debug!(%client_id, %topic, delivered, "published frame");
                }
                Ok(None) => break true,
                Err(e) => {
                    tracing::debug!(%client_id, error = %e, "broker recv error");
                    break false;
                }
            },
        }
    };

    if clean {
        session.publish(&presence_topic, &presence(&client_id, PresenceAction::Disconnect)?)?;
        session.disconnect();
        tracing::info!(%room_id, %client_id, "broker session closed");
    } else {
        drop(session);
        tracing::info!(%room_id, %client_id, "broker session dropped, last will pending");
    }
    Ok(())
}
