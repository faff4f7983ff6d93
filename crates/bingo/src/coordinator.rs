//! The coordinator: turns client intents into room commands.
//!
//! It owns the two pieces of cross-room state: which connections exist
//! (and which room each is in) and the room registry. Room state itself
//! lives in the room actors.

use std::sync::Arc;

use bingo_protocol::{ClientEvent, Number, RoomId, ServerEvent};
use bingo_room::{RoomError, RoomHandle, RoomRegistry, normalize_name};
use bingo_session::{EventSender, SessionError, SessionManager};
use bingo_transport::ConnectionId;
use tokio::sync::Mutex;

/// Routes every connection's events to the right room.
///
/// The session lock is never held across a room command, so a slow room
/// cannot stall other connections.
pub struct Coordinator {
    sessions: Mutex<SessionManager>,
    rooms: RoomRegistry,
}

impl Coordinator {
    /// Creates a coordinator over `rooms`.
    pub fn new(rooms: RoomRegistry) -> Self {
        Self {
            sessions: Mutex::new(SessionManager::new()),
            rooms,
        }
    }

    /// The room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Registers a connection and sends it the current lobby listing.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the id is already registered.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        sender: EventSender,
    ) -> Result<(), SessionError> {
        let listing = self.lobby_listing().await;
        let mut sessions = self.sessions.lock().await;
        let session = sessions.create(connection_id, sender)?;
        session.send(listing);
        tracing::info!(%connection_id, online = sessions.len(), "client connected");
        Ok(())
    }

    /// Handles one client event. Failures go back to the connection as
    /// `error_msg`.
    pub async fn handle(&self, connection_id: ConnectionId, event: ClientEvent) {
        let name = event.name();
        let result = match event {
            ClientEvent::CreateJoinRoom {
                username,
                room_id,
                limit,
            } => self.join(connection_id, &username, &room_id, limit).await,
            ClientEvent::StartGameCmd { room_id } => self.start(connection_id, &room_id).await,
            ClientEvent::BingoShout { room_id, marked } => {
                self.shout(connection_id, &room_id, marked).await
            }
        };

        if let Err(e) = result {
            tracing::debug!(%connection_id, event = name, error = %e, "request rejected");
            self.send_to(connection_id, ServerEvent::error(e.to_string()))
                .await;
        }
    }

    /// Forgets a connection and takes it out of its room.
    ///
    /// Returns `false` if the connection was already gone, so reporting a
    /// disconnect twice leaves the room once.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> bool {
        let session = match self.sessions.lock().await.disconnect(connection_id) {
            Ok(session) => session,
            Err(e) => {
                tracing::trace!(%connection_id, error = %e, "duplicate disconnect ignored");
                return false;
            }
        };
        tracing::info!(%connection_id, room = ?session.room, "client disconnected");

        if let Some(room_id) = session.room {
            if let Some(room) = self.rooms.get(&room_id).await {
                if let Err(e) = room.leave(connection_id).await {
                    tracing::debug!(%connection_id, %room_id, error = %e, "leave on disconnect failed");
                }
            }
        }
        true
    }

    /// Pushes an event to one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        self.sessions.lock().await.send_to(connection_id, event)
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// The current lobby listing as a `room_list_update`.
    pub async fn lobby_listing(&self) -> ServerEvent {
        let rooms = self
            .rooms
            .list_active()
            .await
            .iter()
            .map(|info| info.list_entry())
            .collect();
        ServerEvent::RoomListUpdate { rooms }
    }

    /// Sends the lobby listing to every connection that is not in a room.
    pub async fn publish_lobby(&self) {
        let listing = self.lobby_listing().await;
        let senders = self.sessions.lock().await.lobby_senders();
        tracing::trace!(recipients = senders.len(), "publishing lobby listing");
        for sender in senders {
            let _ = sender.send(listing.clone());
        }
    }

    /// Republishes the lobby listing whenever a room's occupancy or
    /// activity changes. Bursts of changes coalesce into one publish.
    ///
    /// Subscribes when called, so no change made after this returns is
    /// missed, even before the future is first polled.
    pub fn run_lobby_publisher(self: Arc<Self>) -> impl Future<Output = ()> + Send + 'static {
        let mut changes = self.rooms.changes();
        async move {
            while changes.changed().await.is_ok() {
                changes.borrow_and_update();
                self.publish_lobby().await;
            }
        }
    }

    async fn join(
        &self,
        connection_id: ConnectionId,
        username: &str,
        raw_room_id: &str,
        limit: Option<u32>,
    ) -> Result<(), RoomError> {
        let room_id = RoomId::normalize(raw_room_id).ok_or(RoomError::InvalidRoomId)?;
        let name = normalize_name(username)?;

        // Leave the lobby before the room can announce the join, so the
        // lobby publisher never lists rooms to a member.
        let sender = {
            let mut sessions = self.sessions.lock().await;
            let Some(session) = sessions.get(connection_id) else {
                tracing::warn!(%connection_id, "join from unregistered connection");
                return Ok(());
            };
            if let Some(current) = &session.room {
                return Err(RoomError::AlreadyInRoom(current.clone()));
            }
            let sender = session.sender.clone();
            // Cannot fail: the session was found under this same lock.
            let _ = sessions.join_room(connection_id, room_id.clone());
            sender
        };

        let joined = self
            .join_room(connection_id, room_id.clone(), &name, limit, sender)
            .await;

        match joined {
            Ok(room) => {
                if self.sessions.lock().await.get(connection_id).is_none() {
                    // Disconnected while joining; undo.
                    let _ = room.leave(connection_id).await;
                }
                Ok(())
            }
            Err(e) => {
                let mut sessions = self.sessions.lock().await;
                if sessions.leave_room(connection_id).is_some() {
                    // Back in the lobby; catch up on listings missed meanwhile.
                    let listing = self.lobby_listing().await;
                    sessions.send_to(connection_id, listing);
                }
                Err(e)
            }
        }
    }

    /// Joins through the registry, retrying once if the room shut down
    /// between lookup and join.
    async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        name: &str,
        limit: Option<u32>,
        sender: EventSender,
    ) -> Result<RoomHandle, RoomError> {
        let mut retried = false;
        loop {
            let room = self.rooms.get_or_create(room_id.clone(), limit).await?;
            match room.join(connection_id, name, sender.clone()).await {
                Ok(()) => return Ok(room),
                Err(RoomError::Unavailable(_)) if !retried => {
                    tracing::debug!(%room_id, "room shut down during join, retrying");
                    self.rooms.remove_instance(&room_id, room.instance()).await;
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn start(&self, connection_id: ConnectionId, raw_room_id: &str) -> Result<(), RoomError> {
        let room = self.member_room(connection_id, raw_room_id).await?;
        room.start(connection_id).await
    }

    async fn shout(
        &self,
        connection_id: ConnectionId,
        raw_room_id: &str,
        marked: Vec<Number>,
    ) -> Result<(), RoomError> {
        let room = self.member_room(connection_id, raw_room_id).await?;
        room.shout_bingo(connection_id, marked).await
    }

    /// The room `raw_room_id` names, provided the connection is in it.
    async fn member_room(
        &self,
        connection_id: ConnectionId,
        raw_room_id: &str,
    ) -> Result<RoomHandle, RoomError> {
        let room_id = RoomId::normalize(raw_room_id).ok_or(RoomError::InvalidRoomId)?;
        let current = self.sessions.lock().await.room_of(connection_id).cloned();
        if current.as_ref() != Some(&room_id) {
            return Err(RoomError::NotInRoom(room_id));
        }
        self.rooms
            .get(&room_id)
            .await
            .ok_or(RoomError::Unavailable(room_id))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("rooms", &self.rooms)
            .finish_non_exhaustive()
    }
}
