//! Room lifecycle management for Bingo Hall.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, its draw order and its countdown. Nothing about a room is
//! shared; the outside world talks to it through a [`RoomHandle`] and reads
//! its published [`RoomInfo`] snapshot.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms on first join, lists active rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: the game's state machine
//! - [`GameConfig`]: number space, card size, limits and pacing

mod config;
mod error;
mod player;
mod registry;
mod room;

pub use config::{GameConfig, RoomState};
pub use error::{ClaimRejection, RoomError};
pub use player::{MAX_NAME_LEN, normalize_name};
pub use registry::RoomRegistry;
pub use room::{RoomHandle, RoomInfo, RoomInstance};
