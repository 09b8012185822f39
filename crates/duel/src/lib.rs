//! # duel
//!
//! Room server for remote two-player tic-tac-toe and chess.
//!
//! The server owns the authoritative room documents and exposes them
//! through one WebSocket action endpoint, plus a realtime relay that lets
//! the two participants of a room push snapshots to each other:
//!
//! ```text
//!  client ──/actions──→ ActionDesk ──→ RoomLifecycle / MoveArbiter ──→ RoomStore
//!     │
//!     ╰──/relay/{room} or /broker/{room}──→ RelayGateway | Broker ──→ other client
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duel::prelude::*;
//!
//! # async fn start() -> Result<(), DuelError> {
//! let config = ServerConfig::load(None)?;
//! let server = DuelServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{LimitsConfig, RelayBackend, RelayConfig, RoomsConfig, ServerConfig};
pub use error::DuelError;
pub use server::{DuelServer, DuelServerBuilder};

/// Re-exports of the types most servers and clients need.
pub mod prelude {
    pub use crate::{DuelError, DuelServer, DuelServerBuilder, RelayBackend, ServerConfig};
    pub use duel_protocol::{
        ActionReply, ActionRequest, ClientId, Endpoint, GameType, RelayEvent, RoomCode, Seat,
        Winner,
    };
    pub use duel_room::{
        Cell, ChessBoard, ChessMove, Grid, Room, RoomError, StandardChess, TicTacToeRules,
    };
}
