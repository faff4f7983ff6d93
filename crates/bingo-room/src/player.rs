//! Room members.

use bingo_draw::Card;
use bingo_protocol::{Number, ServerEvent};
use bingo_session::EventSender;
use bingo_transport::ConnectionId;

use crate::RoomError;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 24;

/// Trims a display name and checks it is usable.
///
/// # Errors
/// [`RoomError::InvalidName`] if the name is empty after trimming, longer
/// than [`MAX_NAME_LEN`], or contains control characters.
pub fn normalize_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim();
    if name.is_empty()
        || name.chars().count() > MAX_NAME_LEN
        || name.chars().any(char::is_control)
    {
        return Err(RoomError::InvalidName);
    }
    Ok(name.to_owned())
}

/// One member of a room, owned by the room actor.
#[derive(Debug)]
pub(crate) struct Player {
    pub connection_id: ConnectionId,
    pub name: String,
    pub card: Card,
    /// Card numbers drawn so far this game.
    pub marked: usize,
    sender: EventSender,
}

impl Player {
    pub fn new(connection_id: ConnectionId, name: String, card: Card, sender: EventSender) -> Self {
        Self {
            connection_id,
            name,
            card,
            marked: 0,
            sender,
        }
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Gives the player a new card for the next game.
    pub fn reissue(&mut self, card: Card) {
        self.card = card;
        self.marked = 0;
    }

    /// Counts `number` if it is on the card.
    pub fn mark(&mut self, number: Number) {
        if self.card.contains(number) {
            self.marked += 1;
        }
    }

    /// Pushes an event to the player's connection. Silently drops it if
    /// the connection is gone.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
