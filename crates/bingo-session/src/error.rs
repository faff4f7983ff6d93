//! Error types for the session layer.

use bingo_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the connection. Also what a second
    /// `disconnect` for the same connection returns.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// The connection already has a session.
    #[error("{0} is already connected")]
    AlreadyConnected(ConnectionId),
}
