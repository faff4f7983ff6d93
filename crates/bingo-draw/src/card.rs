//! Player cards.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{DrawError, Number, NumberSpace};

/// A player's card: distinct numbers from the space, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(Vec<Number>);

impl Card {
    /// The card's numbers, ascending.
    pub fn numbers(&self) -> &[Number] {
        &self.0
    }

    /// How many numbers the card holds.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` only for a card built from an empty list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the card holds `n`.
    pub fn contains(&self, n: Number) -> bool {
        self.0.binary_search(&n).is_ok()
    }

    /// How many of the card's numbers satisfy `drawn`.
    pub fn count_marked(&self, drawn: impl Fn(Number) -> bool) -> usize {
        self.0.iter().filter(|n| drawn(**n)).count()
    }

    /// Whether every number on the card satisfies `drawn`.
    pub fn is_covered_by(&self, drawn: impl Fn(Number) -> bool) -> bool {
        self.0.iter().all(|n| drawn(*n))
    }

    /// Copies the numbers out for the wire.
    pub fn to_vec(&self) -> Vec<Number> {
        self.0.clone()
    }
}

impl From<Vec<Number>> for Card {
    /// Builds a card from arbitrary numbers, sorting and de-duplicating them.
    fn from(mut numbers: Vec<Number>) -> Self {
        numbers.sort_unstable();
        numbers.dedup();
        Self(numbers)
    }
}

/// Draws `card_size` distinct numbers uniformly from `space`.
///
/// Runs a partial Fisher–Yates shuffle over the space, so every
/// `card_size`-subset is equally likely.
///
/// # Errors
/// [`DrawError::InvalidCardSize`] if `card_size` is zero or larger than the
/// space.
pub fn generate_card<R: Rng + ?Sized>(
    space: &NumberSpace,
    card_size: usize,
    rng: &mut R,
) -> Result<Card, DrawError> {
    if card_size == 0 || card_size > space.len() {
        return Err(DrawError::InvalidCardSize {
            card_size,
            space_size: space.len(),
        });
    }

    let mut pool: Vec<Number> = space.iter().collect();
    let (picked, _) = pool.partial_shuffle(rng, card_size);
    let mut numbers = picked.to_vec();
    numbers.sort_unstable();
    Ok(Card(numbers))
}
