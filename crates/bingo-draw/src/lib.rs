//! Randomness for Bingo Hall: player cards and the room's draw order.
//!
//! Both pieces are pure with respect to shared state: they take a
//! [`NumberSpace`] and an injected random source, so tests can pin a seed
//! and get the same card or the same draw order every run.
//!
//! - [`generate_card`]: `card_size` distinct numbers for one player
//! - [`DrawSequencer`]: a lazily produced random permutation of the space

mod card;
mod error;
mod sequencer;
mod space;

pub use bingo_protocol::Number;
pub use card::{Card, generate_card};
pub use error::DrawError;
pub use sequencer::DrawSequencer;
pub use space::NumberSpace;
