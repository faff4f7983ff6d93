//! The session manager: tracks every live connection.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` wrapper; the coordinator keeps it
//! behind a mutex and never holds that lock across a room call.

use std::collections::HashMap;
use std::time::Instant;

use bingo_protocol::{RoomId, ServerEvent};
use bingo_transport::ConnectionId;

use crate::{EventSender, Session, SessionError};

/// Registry of live connections.
///
/// ```text
/// create() ──→ [lobby] ──join_room()──→ [in room] ──leave_room()──→ [lobby]
///                 │                         │
///                 └────── disconnect() ─────┴──→ (gone; repeat calls → NotFound)
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection in the lobby.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the id is already registered.
    pub fn create(
        &mut self,
        connection_id: ConnectionId,
        sender: EventSender,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyConnected(connection_id));
        }
        let session = self.sessions.entry(connection_id).or_insert(Session {
            connection_id,
            sender,
            room: None,
            connected_at: Instant::now(),
        });
        tracing::debug!(%connection_id, "session created");
        Ok(session)
    }

    /// Forgets a connection and returns its last state.
    ///
    /// Only the first call for a connection succeeds, which is what makes
    /// the implicit leave-on-disconnect run exactly once.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the connection is unknown or was
    /// already disconnected.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        tracing::debug!(
            %connection_id,
            room = ?session.room,
            online_secs = session.connected_at.elapsed().as_secs(),
            "session closed"
        );
        Ok(session)
    }

    /// Looks up a session.
    pub fn get(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    /// Records that the connection joined `room`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the connection is gone.
    pub fn join_room(
        &mut self,
        connection_id: ConnectionId,
        room: RoomId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        session.room = Some(room);
        Ok(())
    }

    /// Returns the connection to the lobby. Returns the room it was in.
    pub fn leave_room(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        self.sessions
            .get_mut(&connection_id)
            .and_then(|s| s.room.take())
    }

    /// The room a connection is in, if any.
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomId> {
        self.sessions
            .get(&connection_id)
            .and_then(|s| s.room.as_ref())
    }

    /// Pushes an event to one connection. Returns `false` if it is gone.
    pub fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        self.sessions
            .get(&connection_id)
            .is_some_and(|s| s.send(event))
    }

    /// Senders of every connection currently in the lobby.
    ///
    /// Cloned out so the caller can release the lock before sending.
    pub fn lobby_senders(&self) -> Vec<EventSender> {
        self.sessions
            .values()
            .filter(|s| s.in_lobby())
            .map(|s| s.sender.clone())
            .collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` when nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_channel;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room(id: &str) -> RoomId {
        RoomId::normalize(id).unwrap()
    }

    #[test]
    fn test_create_registers_in_lobby() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = event_channel();
        let session = mgr.create(cid(1), tx).unwrap();
        assert!(session.in_lobby());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_create_twice_fails() {
        let mut mgr = SessionManager::new();
        mgr.create(cid(1), event_channel().0).unwrap();
        let result = mgr.create(cid(1), event_channel().0);
        assert!(matches!(result, Err(SessionError::AlreadyConnected(_))));
    }

    #[test]
    fn test_disconnect_succeeds_exactly_once() {
        let mut mgr = SessionManager::new();
        mgr.create(cid(1), event_channel().0).unwrap();
        mgr.join_room(cid(1), room("r1")).unwrap();

        let session = mgr.disconnect(cid(1)).unwrap();
        assert_eq!(session.room, Some(room("r1")));

        assert!(matches!(
            mgr.disconnect(cid(1)),
            Err(SessionError::NotFound(_))
        ));
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_room_tracking() {
        let mut mgr = SessionManager::new();
        mgr.create(cid(1), event_channel().0).unwrap();
        assert_eq!(mgr.room_of(cid(1)), None);

        mgr.join_room(cid(1), room("r1")).unwrap();
        assert_eq!(mgr.room_of(cid(1)), Some(&room("R1")));

        assert_eq!(mgr.leave_room(cid(1)), Some(room("r1")));
        assert_eq!(mgr.room_of(cid(1)), None);
        assert_eq!(mgr.leave_room(cid(1)), None);
    }

    #[test]
    fn test_join_room_unknown_connection() {
        let mut mgr = SessionManager::new();
        assert!(mgr.join_room(cid(9), room("r1")).is_err());
    }

    #[test]
    fn test_lobby_senders_skip_players_in_rooms() {
        let mut mgr = SessionManager::new();
        let (tx1, mut rx1) = event_channel();
        let (tx2, mut rx2) = event_channel();
        mgr.create(cid(1), tx1).unwrap();
        mgr.create(cid(2), tx2).unwrap();
        mgr.join_room(cid(2), room("r1")).unwrap();

        let senders = mgr.lobby_senders();
        assert_eq!(senders.len(), 1);
        for s in senders {
            let _ = s.send(ServerEvent::error("hi"));
        }
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_send_to_closed_connection_reports_false() {
        let mut mgr = SessionManager::new();
        let (tx, rx) = event_channel();
        mgr.create(cid(1), tx).unwrap();
        drop(rx);
        assert!(!mgr.send_to(cid(1), ServerEvent::error("x")));
        assert!(!mgr.send_to(cid(2), ServerEvent::error("x")));
    }
}
