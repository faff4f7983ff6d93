//! Game configuration and room state machine.

use std::time::Duration;

use bingo_draw::{DrawError, NumberSpace};
use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room on a server.
///
/// Defaults match the browser client: 20-number cards from 1–60, a 20 s
/// lead-in before the first draw and 16 s between draws.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Numbers that can be drawn.
    pub space: NumberSpace,

    /// Numbers on each player's card.
    pub card_size: usize,

    /// Room limit when the creator does not pick one.
    pub default_limit: u32,

    /// Largest limit a creator may pick.
    pub max_limit: u32,

    /// Start the game as soon as the room fills up.
    pub auto_start_when_full: bool,

    /// Spin before the first number of a game.
    pub pre_draw_delay: Duration,

    /// Spin before each later number.
    pub spin_duration: Duration,

    /// How long a drawn number stays on screen before the next spin.
    pub reveal_pacing: Duration,

    /// How long a finished game is shown before the room returns to its
    /// lobby.
    pub game_over_idle: Duration,

    /// When set, rooms broadcast a `countdown` this often while a phase runs.
    pub countdown_interval: Option<Duration>,

    /// Fixed seed for cards and draw order. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            space: NumberSpace::default(),
            card_size: 20,
            default_limit: 20,
            max_limit: 100,
            auto_start_when_full: true,
            pre_draw_delay: Duration::from_secs(20),
            spin_duration: Duration::from_secs(4),
            reveal_pacing: Duration::from_secs(12),
            game_over_idle: Duration::from_secs(30),
            countdown_interval: None,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Checks that rooms built from this config can run a game.
    ///
    /// # Errors
    /// - [`RoomError::InvalidConfiguration`] for an empty space or a card
    ///   size that does not fit it
    /// - [`RoomError::InvalidLimit`] if `default_limit` is outside
    ///   `1..=max_limit`
    pub fn validate(&self) -> Result<(), RoomError> {
        // Re-check the space: a deserialized config skips `NumberSpace::new`.
        let space = NumberSpace::new(self.space.low(), self.space.high())?;
        if self.card_size == 0 || self.card_size > space.len() {
            return Err(DrawError::InvalidCardSize {
                card_size: self.card_size,
                space_size: space.len(),
            }
            .into());
        }
        self.resolve_limit(Some(self.default_limit))?;
        Ok(())
    }

    /// The limit a new room gets for a creator's request.
    ///
    /// # Errors
    /// [`RoomError::InvalidLimit`] when the request is outside
    /// `1..=max_limit`.
    pub fn resolve_limit(&self, requested: Option<u32>) -> Result<u32, RoomError> {
        let limit = requested.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(RoomError::InvalidLimit {
                limit,
                max: self.max_limit,
            });
        }
        Ok(limit)
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby → Starting → Spinning ⇄ NumberRevealed
///                       │            │
///                       └──→ GameOver ←┘ ──(idle)──→ Lobby
/// ```
///
/// - **Lobby**: accepting joins; the admin may start.
/// - **Starting**: transient while a fresh draw order is set up.
/// - **Spinning**: the wheel spins; a number is drawn when the countdown
///   ends.
/// - **NumberRevealed**: the last number is on screen.
/// - **GameOver**: someone won or the numbers ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Lobby,
    Starting,
    Spinning,
    NumberRevealed,
    GameOver,
}

impl RoomState {
    /// Returns `true` if the room is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while a game is running. Shown as `active` in the
    /// lobby listing.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Spinning | Self::NumberRevealed)
    }

    /// Returns `true` when a bingo claim can be judged.
    pub fn accepts_claims(&self) -> bool {
        matches!(self, Self::Spinning | Self::NumberRevealed)
    }

    /// Returns `true` if moving to `target` follows an edge of the machine.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomState::*;
        matches!(
            (self, target),
            (Lobby, Starting)
                | (Starting, Spinning)
                | (Spinning, NumberRevealed)
                | (NumberRevealed, Spinning)
                | (Spinning, GameOver)
                | (NumberRevealed, GameOver)
                | (GameOver, Lobby)
        )
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Starting => write!(f, "Starting"),
            Self::Spinning => write!(f, "Spinning"),
            Self::NumberRevealed => write!(f, "NumberRevealed"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
