//! Error types for card and draw configuration.

use bingo_protocol::Number;

/// Errors raised while validating a number space or card size.
///
/// Both only happen with bad constants; a validated `GameConfig` never
/// produces them at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    /// The number space is empty or starts at zero.
    #[error("invalid number space {low}..={high}")]
    InvalidSpace { low: Number, high: Number },

    /// A card cannot hold more numbers than the space has, and must hold at
    /// least one.
    #[error("card size {card_size} does not fit a number space of {space_size}")]
    InvalidCardSize { card_size: usize, space_size: usize },
}
