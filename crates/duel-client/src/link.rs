//! Relay links: how a client session publishes events to its room.
//!
//! Receiving is left to the caller, who owns the inbound side (a channel
//! receiver or the WebSocket read half) and feeds every frame into
//! [`ClientSession::apply_frame`](crate::ClientSession::apply_frame).

use std::future::Future;
use std::sync::Arc;

use duel_protocol::{
    ClientId, Codec, Endpoint, EventHeader, JsonCodec, PresenceAction, ProtocolError, RelayEvent,
    RoomCode,
};
use duel_relay::topic::{events_topic, presence_topic, room_filter};
use duel_relay::{Attachment, Broker, BrokerMessage, BrokerSession, LastWill, RelayGateway};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::ClientError;

/// Publishes raw relay frames for one session.
pub trait RelayLink: Send + Sync {
    fn publish(&self, frame: Vec<u8>) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Encodes the `presence` event a session announces itself (or is
/// mourned) with.
pub fn presence_frame(
    client_id: &ClientId,
    action: PresenceAction,
) -> Result<Vec<u8>, ClientError> {
    let event: RelayEvent<(), ()> = RelayEvent::Presence {
        client_id: client_id.clone(),
        action,
    };
    Ok(JsonCodec.encode(&event)?)
}

// ---------------------------------------------------------------------------
// In-process gateway
// ---------------------------------------------------------------------------

/// A session attached to an in-process [`RelayGateway`].
pub struct GatewayLink {
    attachment: Attachment,
}

impl GatewayLink {
    /// Attaches to `room_id`. The receiver yields the `joined` greeting
    /// first, then every frame other sessions publish.
    pub fn attach(
        gateway: &Arc<RelayGateway>,
        room_id: RoomCode,
        name: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Vec<u8>>), ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let attachment = gateway.attach(room_id, name, tx)?;
        Ok((Self { attachment }, rx))
    }
}

impl RelayLink for GatewayLink {
    async fn publish(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        self.attachment.forward(&frame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-process broker
// ---------------------------------------------------------------------------

/// A session connected to an in-process [`Broker`].
///
/// Connecting registers a last will carrying this session's `disconnect`
/// presence, subscribes to the whole room namespace, and announces the
/// session with a `connect` presence.
pub struct BrokerLink {
    session: BrokerSession,
    room_id: RoomCode,
}

impl BrokerLink {
    pub fn connect(
        broker: &Arc<Broker>,
        room_id: RoomCode,
        client_id: ClientId,
    ) -> Result<(Self, mpsc::UnboundedReceiver<BrokerMessage>), ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let will = LastWill {
            topic: presence_topic(&room_id),
            payload: presence_frame(&client_id, PresenceAction::Disconnect)?,
        };
        let session = broker.connect(client_id.clone(), Some(will), tx)?;
        session.subscribe(&room_filter(&room_id))?;
        session.publish(
            &presence_topic(&room_id),
            &presence_frame(&client_id, PresenceAction::Connect)?,
        )?;
        Ok((Self { session, room_id }, rx))
    }

    /// Clean close: announces the disconnect and cancels the will.
    pub fn close(self) -> Result<(), ClientError> {
        let farewell = presence_frame(self.session.client_id(), PresenceAction::Disconnect)?;
        self.session.publish(&presence_topic(&self.room_id), &farewell)?;
        self.session.disconnect();
        Ok(())
    }
}

impl RelayLink for BrokerLink {
    /// Presence frames go to the presence topic, everything else to the
    /// events topic.
    async fn publish(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        let topic = match EventHeader::peek(&frame)?.kind.as_str() {
            "presence" => presence_topic(&self.room_id),
            _ => events_topic(&self.room_id),
        };
        self.session.publish(&topic, &frame)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay session over the server's `/relay` or `/broker` endpoint.
///
/// The socket is split so one task can wait in
/// [`next_frame`](Self::next_frame) while another publishes.
pub struct WsRelayLink {
    sink: Mutex<SplitSink<ClientStream, Message>>,
    stream: Mutex<SplitStream<ClientStream>>,
}

impl WsRelayLink {
    /// Connects to `endpoint` on the server at `base_url`
    /// (e.g. `ws://127.0.0.1:8080`).
    pub async fn connect(base_url: &str, endpoint: &Endpoint) -> Result<Self, ClientError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint.target());
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();
        Ok(Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    /// The next frame from the relay, or `None` once the server closed.
    pub async fn next_frame(&self) -> Result<Option<Vec<u8>>, ClientError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Sends a close frame. On the broker endpoint this counts as a clean
    /// disconnect.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.sink.lock().await.close().await?;
        Ok(())
    }
}

impl RelayLink for WsRelayLink {
    async fn publish(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        let text = String::from_utf8(frame).map_err(|e| {
            ProtocolError::InvalidMessage(format!("relay frame is not UTF-8: {e}"))
        })?;
        self.sink.lock().await.send(Message::Text(text.into())).await?;
        Ok(())
    }
}
