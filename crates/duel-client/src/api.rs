//! The action API seam: how a client reaches the room authority.

use std::future::Future;

use duel_protocol::{ActionReply, ActionRequest, Codec, Endpoint, JsonCodec};
use duel_room::{ActionDesk, GameRules, Room, RoomStore};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::ClientError;

/// Sends one action and returns the authoritative reply.
///
/// `B` is the board type of the game the client plays.
pub trait ActionApi<B>: Send + Sync {
    fn perform(
        &self,
        request: ActionRequest,
    ) -> impl Future<Output = Result<ActionReply<Room<B>>, ClientError>> + Send;
}

// ---------------------------------------------------------------------------
// LocalActions
// ---------------------------------------------------------------------------

/// Runs actions against an [`ActionDesk`] in the same process.
pub struct LocalActions<G: GameRules, S> {
    desk: ActionDesk<G, S>,
}

impl<G: GameRules, S> LocalActions<G, S> {
    pub fn new(desk: ActionDesk<G, S>) -> Self {
        Self { desk }
    }
}

impl<G, S> ActionApi<G::Board> for LocalActions<G, S>
where
    G: GameRules,
    S: RoomStore<G::Board>,
{
    async fn perform(
        &self,
        request: ActionRequest,
    ) -> Result<ActionReply<Room<G::Board>>, ClientError> {
        Ok(self.desk.handle(&request).await)
    }
}

// ---------------------------------------------------------------------------
// RemoteActions
// ---------------------------------------------------------------------------

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs actions over the server's `/actions` WebSocket, one request at a
/// time.
///
/// The server answers requests in order, so replies are matched by
/// position. If a `perform` future is dropped after its request went out,
/// the request stays counted as unanswered and the next `perform` discards
/// that many replies before reading its own.
pub struct RemoteActions {
    inner: Mutex<Inner>,
}

struct Inner {
    ws: ClientStream,
    unanswered: usize,
}

impl RemoteActions {
    /// Connects to `{base_url}/actions`, e.g. `ws://127.0.0.1:8080`.
    pub async fn connect(base_url: &str) -> Result<Self, ClientError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), Endpoint::Actions.target());
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self {
            inner: Mutex::new(Inner { ws, unanswered: 0 }),
        })
    }
}

impl<B> ActionApi<B> for RemoteActions
where
    B: DeserializeOwned + Send,
{
    async fn perform(&self, request: ActionRequest) -> Result<ActionReply<Room<B>>, ClientError> {
        let frame = JsonCodec.encode(&request)?;
        let text = String::from_utf8_lossy(&frame).into_owned();

        let mut inner = self.inner.lock().await;
        if inner.unanswered > 0 {
            inner.ws.flush().await?;
        }
        while inner.unanswered > 0 {
            let stale = next_reply(&mut inner.ws).await?;
            inner.unanswered -= 1;
            tracing::debug!(bytes = stale.len(), "discarded reply to an abandoned request");
        }

        // Counted as soon as the frame is queued.
        inner.ws.feed(Message::Text(text.into())).await?;
        inner.unanswered += 1;
        inner.ws.flush().await?;

        let reply = next_reply(&mut inner.ws).await?;
        inner.unanswered -= 1;
        Ok(JsonCodec.decode(&reply)?)
    }
}

async fn next_reply(ws: &mut ClientStream) -> Result<Vec<u8>, ClientError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().as_bytes().to_vec()),
            Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
