//! `BingoServer` builder and server loop.
//!
//! This is the entry point for running a Bingo Hall server. It ties
//! together all the layers: transport → protocol → coordinator → rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use bingo_protocol::{Codec, JsonCodec};
use bingo_room::{GameConfig, RoomRegistry};
use bingo_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{BingoError, Coordinator};

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// Settings shared by every room.
    pub game: GameConfig,
}

impl ServerConfig {
    /// Default listen address.
    pub const DEFAULT_ADDR: &'static str = "127.0.0.1:8080";

    /// Environment variable that overrides the listen address.
    pub const ADDR_VAR: &'static str = "BINGO_ADDR";

    /// Defaults, with the listen address taken from `BINGO_ADDR` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var(Self::ADDR_VAR) {
            if !addr.trim().is_empty() {
                config.bind_addr = addr.trim().to_string();
            }
        }
        config
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: Self::DEFAULT_ADDR.to_string(),
            game: GameConfig::default(),
        }
    }
}

/// Builder for configuring and starting a Bingo Hall server.
///
/// # Example
///
/// ```rust,ignore
/// let server = BingoServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Default)]
pub struct BingoServerBuilder {
    config: ServerConfig,
}

impl BingoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the game configuration.
    pub fn game_config(mut self, game: GameConfig) -> Self {
        self.config.game = game;
        self
    }

    /// Validates the configuration and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// A [`BingoError::Room`] for an invalid game configuration, or a
    /// [`BingoError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<BingoServer<JsonCodec>, BingoError> {
        let rooms = RoomRegistry::new(self.config.game)?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        Ok(BingoServer {
            transport,
            coordinator: Arc::new(Coordinator::new(rooms)),
            codec: Arc::new(JsonCodec),
        })
    }
}

/// A bound Bingo Hall server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BingoServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    coordinator: Arc<Coordinator>,
    codec: Arc<C>,
}

impl BingoServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> BingoServerBuilder {
        BingoServerBuilder::new()
    }
}

impl<C: Codec> BingoServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, BingoError> {
        Ok(self.transport.local_addr()?)
    }

    /// The coordinator serving this server's connections.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Runs the lobby publisher and the accept loop.
    ///
    /// Spawns a handler task for each connection. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), BingoError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Bingo Hall server running");
        tokio::spawn(Arc::clone(&self.coordinator).run_lobby_publisher());

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let coordinator = Arc::clone(&self.coordinator);
                    let codec = Arc::clone(&self.codec);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, coordinator, codec).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
