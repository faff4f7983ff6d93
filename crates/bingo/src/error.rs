//! Unified error type for Bingo Hall.

use bingo_draw::DrawError;
use bingo_protocol::ProtocolError;
use bingo_room::RoomError;
use bingo_session::SessionError;
use bingo_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BingoError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown or duplicate connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not admin, late claim, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A bad number space or card size.
    #[error(transparent)]
    Draw(#[from] DrawError),
}
