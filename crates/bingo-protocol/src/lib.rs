//! Wire protocol for Bingo Hall.
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): the named events that
//!   travel between browser and server, each with a JSON payload.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become text
//!   frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (events) → Coordinator (rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientEvent, Number, RoomId, RoomListEntry, ServerEvent};
