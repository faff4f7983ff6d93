//! Connection sessions for Bingo Hall.
//!
//! A session is the server's record of one live connection: where to push
//! its outbound events and which room, if any, it is playing in. Identity
//! is nothing more than the connection itself plus the display name chosen
//! at join time, which lives in the room.
//!
//! ```text
//! Room Layer (above)    ← pushes events through each session's sender
//!     ↕
//! Session Layer (this)  ← who is connected, who is in the lobby
//!     ↕
//! Transport (below)     ← provides ConnectionId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{EventSender, Session, event_channel};
