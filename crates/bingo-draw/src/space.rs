//! The range of numbers a game draws from.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{DrawError, Number};

/// An inclusive range of drawable numbers, `1..=60` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSpace {
    low: Number,
    high: Number,
}

impl NumberSpace {
    /// Creates a space covering `low..=high`.
    ///
    /// # Errors
    /// [`DrawError::InvalidSpace`] if `low` is zero or `low > high`.
    pub fn new(low: Number, high: Number) -> Result<Self, DrawError> {
        if low == 0 || low > high {
            return Err(DrawError::InvalidSpace { low, high });
        }
        Ok(Self { low, high })
    }

    /// Smallest number in the space.
    pub fn low(&self) -> Number {
        self.low
    }

    /// Largest number in the space.
    pub fn high(&self) -> Number {
        self.high
    }

    /// How many numbers the space holds.
    pub fn len(&self) -> usize {
        usize::from(self.high - self.low) + 1
    }

    /// Always `false`; a constructed space holds at least one number.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `n` belongs to the space.
    pub fn contains(&self, n: Number) -> bool {
        (self.low..=self.high).contains(&n)
    }

    /// Every number in ascending order.
    pub fn iter(&self) -> RangeInclusive<Number> {
        self.low..=self.high
    }
}

impl Default for NumberSpace {
    fn default() -> Self {
        Self { low: 1, high: 60 }
    }
}
