//! Error types for the room layer.
//!
//! Every variant is recoverable. The coordinator renders them with
//! `Display` into an `error_msg` for the connection that caused them.

use std::fmt;

use bingo_draw::DrawError;
use bingo_protocol::RoomId;

use crate::MAX_NAME_LEN;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The number space or card size cannot produce a game.
    #[error("invalid game configuration: {0}")]
    InvalidConfiguration(#[from] DrawError),

    /// The room is at its limit.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Someone in the room already uses this name.
    #[error("the name {0:?} is already taken in this room")]
    DuplicateName(String),

    /// Only the admin may start the game.
    #[error("only the room admin can start the game")]
    NotAdmin,

    /// A game is in progress.
    #[error("a game is already running in room {0}")]
    AlreadyRunning(RoomId),

    /// The last game ended and the room has not reopened its lobby yet.
    #[error("the game in room {0} just ended; the room reopens shortly")]
    BetweenGames(RoomId),

    /// A bingo claim that arrived at the wrong time or with an incomplete
    /// card.
    #[error("bingo claim rejected: {0}")]
    LateOrInvalidClaim(ClaimRejection),

    /// Empty or overlong display name.
    #[error("name must be 1 to {} characters", MAX_NAME_LEN)]
    InvalidName,

    /// Requested room limit out of range.
    #[error("room limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: u32, max: u32 },

    /// Room id that normalizes to nothing.
    #[error("room id must be 1 to {} printable characters", RoomId::MAX_LEN)]
    InvalidRoomId,

    /// The connection is already a member of a room.
    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),

    /// The connection is not a member of the room it addressed.
    #[error("not a member of room {0}")]
    NotInRoom(RoomId),

    /// The room actor has shut down.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

/// Why a bingo claim was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    /// The game has not started.
    NoGameRunning,
    /// Someone already won this round.
    TooLate,
    /// Not every number on the card has been drawn.
    CardIncomplete,
}

impl fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGameRunning => f.write_str("no game running"),
            Self::TooLate => f.write_str("too late"),
            Self::CardIncomplete => f.write_str("card is not complete"),
        }
    }
}
