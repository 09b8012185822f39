//! `DuelServer` builder and server loop.
//!
//! This is the entry point for running a duel server. It ties together
//! the layers: transport → protocol → rooms / relay.

use std::sync::Arc;
use std::time::Duration;

use duel_protocol::JsonCodec;
use duel_relay::{Broker, RelayGateway};
use duel_room::{
    ActionDesk, ChessBoard, Grid, MemoryRoomStore, StandardChess, TicTacToeRules,
};
use duel_transport::{PendingConnection, Transport, WebSocketTransport};

use crate::config::{RelayBackend, ServerConfig};
use crate::handler::handle_connection;
use crate::DuelError;

/// The relay the server was configured with.
pub(crate) enum Relay {
    Gateway(Arc<RelayGateway>),
    Broker(Arc<Broker>),
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) tictactoe: ActionDesk<TicTacToeRules, MemoryRoomStore<Grid>>,
    pub(crate) chess: ActionDesk<StandardChess, MemoryRoomStore<ChessBoard>>,
    pub(crate) relay: Relay,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a duel server.
///
/// # Example
///
/// ```rust,ignore
/// use duel::prelude::*;
///
/// let server = DuelServer::builder()
///     .config(ServerConfig::load(None)?)
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct DuelServerBuilder {
    config: ServerConfig,
}

impl DuelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.listen_addr = addr.to_string();
        self
    }

    /// Selects the relay backend.
    pub fn relay(mut self, backend: RelayBackend) -> Self {
        self.config.relay.backend = backend;
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<DuelServer, DuelError> {
        let config = self.config;
        config.validate()?;

        let transport = WebSocketTransport::bind(&config.listen_addr)
            .await?
            .with_handshake_timeout(config.handshake_timeout());

        let relay = match config.relay.backend {
            RelayBackend::Gateway => Relay::Gateway(Arc::new(RelayGateway::new())),
            RelayBackend::Broker => Relay::Broker(Arc::new(Broker::new(config.last_will_delay()))),
        };

        let state = Arc::new(ServerState {
            tictactoe: ActionDesk::new(
                Arc::new(TicTacToeRules),
                Arc::new(MemoryRoomStore::new()),
                config.room_config(),
            ),
            chess: ActionDesk::new(
                Arc::new(StandardChess::default()),
                Arc::new(MemoryRoomStore::new()),
                config.room_config(),
            ),
            relay,
            codec: JsonCodec,
            idle_timeout: config.idle_timeout(),
        });

        Ok(DuelServer {
            transport,
            state,
            backend: config.relay.backend,
        })
    }
}

impl Default for DuelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound duel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    backend: RelayBackend,
}

impl DuelServer {
    /// Creates a new builder.
    pub fn builder() -> DuelServerBuilder {
        DuelServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn relay_backend(&self) -> RelayBackend {
        self.backend
    }

    /// Runs the accept loop. Each connection's handshake and handler run
    /// on a task of their own. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DuelError> {
        tracing::info!(relay = ?self.backend, "duel server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let addr = pending.peer_addr();
                        let conn = match pending.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%addr, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(%addr, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
