//! # Bingo Hall
//!
//! A multi-room bingo server. Players connect over WebSocket, pick a room
//! by name (creating it if nobody has), and play: the server draws numbers
//! on a timer, judges bingo claims against what it actually drew, and
//! keeps a lobby listing of every occupied room up to date.
//!
//! ```text
//! bingo-transport  WebSocket frames, ConnectionId
//! bingo-protocol   ClientEvent / ServerEvent, JsonCodec
//! bingo-session    who is connected, who is in the lobby
//! bingo-draw       cards and draw order
//! bingo-timer      per-room countdown
//! bingo-room       room actors and the registry
//! bingo (this)     coordinator, connection handler, server
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bingo::prelude::*;
//!
//! # async fn run() -> Result<(), BingoError> {
//! bingo::telemetry::init_tracing("info");
//! let server = BingoServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .game_config(GameConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod coordinator;
mod error;
mod handler;
mod server;
pub mod telemetry;

pub use coordinator::Coordinator;
pub use error::BingoError;
pub use server::{BingoServer, BingoServerBuilder, ServerConfig};

/// Everything needed to run or embed a server.
pub mod prelude {
    pub use crate::{BingoError, BingoServer, BingoServerBuilder, Coordinator, ServerConfig};
    pub use bingo_draw::NumberSpace;
    pub use bingo_protocol::{ClientEvent, Number, RoomId, RoomListEntry, ServerEvent};
    pub use bingo_room::{GameConfig, RoomError, RoomInfo, RoomRegistry, RoomState};
    pub use bingo_session::{EventSender, event_channel};
    pub use bingo_transport::ConnectionId;
}
