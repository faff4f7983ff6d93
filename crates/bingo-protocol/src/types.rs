//! Event types for Bingo Hall's wire format.
//!
//! Every frame is one named event with a payload, adjacently tagged:
//!
//! ```text
//! { "event": "number_drawn", "data": { "number": 42 } }
//! ```
//!
//! Event names are `snake_case` and match what the browser client emits and
//! listens for.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A number from the game's number space (1–60 by default).
pub type Number = u16;

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// A room identifier, case-normalized.
///
/// Players type room names by hand, so `" r1 "`, `"R1"` and `"r1"` must all
/// land in the same room. [`RoomId::normalize`] trims and upper-cases; it is
/// the only way to build one from user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Longest accepted room id, in characters.
    pub const MAX_LEN: usize = 32;

    /// Normalizes raw user input into a room id.
    ///
    /// Returns `None` for ids that are empty after trimming, longer than
    /// [`Self::MAX_LEN`], or contain control characters.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.chars().count() > Self::MAX_LEN
            || trimmed.chars().any(char::is_control)
        {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    /// The normalized id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Lobby listing
// ---------------------------------------------------------------------------

/// One row of the lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    /// The room's id.
    pub id: RoomId,
    /// Members currently in the room.
    pub count: usize,
    /// Capacity chosen by the room's creator.
    pub limit: u32,
    /// `true` while a game is running.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// ClientEvent: client → server
// ---------------------------------------------------------------------------

/// Intents a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a room, creating it first if no room has that id.
    ///
    /// `limit` only matters when the room is created. Browsers post it
    /// straight from a form field, so a numeric string is accepted too.
    CreateJoinRoom {
        username: String,
        room_id: String,
        #[serde(default, deserialize_with = "lenient_limit")]
        limit: Option<u32>,
    },

    /// Admin asks to start the game.
    StartGameCmd { room_id: String },

    /// A player claims a full card. `marked` is what the client marked;
    /// the server only treats it as a hint.
    BingoShout {
        room_id: String,
        #[serde(default)]
        marked: Vec<Number>,
    },
}

impl ClientEvent {
    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateJoinRoom { .. } => "create_join_room",
            Self::StartGameCmd { .. } => "start_game_cmd",
            Self::BingoShout { .. } => "bingo_shout",
        }
    }
}

/// Accepts `20`, `20.0`, `"20"`, `" 20 "`, `""` (absent) or `null` (absent).
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Float(f)) => {
            if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) {
                Ok(Some(f as u32))
            } else {
                Err(D::Error::custom(format!("limit must be a whole number, got {f}")))
            }
        }
        Some(Raw::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("limit must be a number, got {text:?}")))
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: server → client
// ---------------------------------------------------------------------------

/// Events the server sends.
///
/// Payload-less events are struct variants with no fields so they still
/// carry `"data": {}` on the wire, which the browser client expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A request from this connection was rejected.
    ErrorMsg { msg: String },

    /// Lobby listing of every room with members.
    RoomListUpdate { rooms: Vec<RoomListEntry> },

    /// You are in the room; here is your card.
    RoomJoined {
        room_id: RoomId,
        card: Vec<Number>,
        limit: u32,
        is_admin: bool,
    },

    /// Roster changed. `players` is in join order.
    UpdatePlayers {
        count: usize,
        limit: u32,
        players: Vec<String>,
        admin: Option<String>,
    },

    /// The admin started the game.
    GameStarted {},

    /// The wheel is spinning; a number follows when the countdown ends.
    SpinningStart {},

    /// A number was drawn.
    NumberDrawn { number: Number },

    /// Seconds left in the current phase. Only sent when the server has a
    /// countdown interval configured.
    Countdown { remaining_secs: u64 },

    /// The game ended. `winner` is `None` when every number was drawn
    /// without a valid claim.
    GameOver { winner: Option<String> },
}

impl ServerEvent {
    /// Shorthand for an `error_msg` event.
    pub fn error(msg: impl Into<String>) -> Self {
        Self::ErrorMsg { msg: msg.into() }
    }

    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ErrorMsg { .. } => "error_msg",
            Self::RoomListUpdate { .. } => "room_list_update",
            Self::RoomJoined { .. } => "room_joined",
            Self::UpdatePlayers { .. } => "update_players",
            Self::GameStarted {} => "game_started",
            Self::SpinningStart {} => "spinning_start",
            Self::NumberDrawn { .. } => "number_drawn",
            Self::Countdown { .. } => "countdown",
            Self::GameOver { .. } => "game_over",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
