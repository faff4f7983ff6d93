//! Session types.

use std::time::Instant;

use bingo_protocol::{RoomId, ServerEvent};
use bingo_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for delivering events to one connection.
///
/// Unbounded so a room never waits on a slow client; the connection's
/// writer task drains it in order.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Creates the outbound channel for a new connection.
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<ServerEvent>) {
    mpsc::unbounded_channel()
}

/// One live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// The connection this session belongs to.
    pub connection_id: ConnectionId,

    /// Where outbound events for this connection go.
    pub sender: EventSender,

    /// The room the connection is playing in. `None` means it is in the
    /// lobby and receives room listings.
    pub room: Option<RoomId>,

    /// When the connection was registered.
    pub connected_at: Instant,
}

impl Session {
    /// Pushes an event to the connection.
    ///
    /// Returns `false` if the connection's writer is gone; callers skip it.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Whether this connection is in the lobby (not in any room).
    pub fn in_lobby(&self) -> bool {
        self.room.is_none()
    }
}
