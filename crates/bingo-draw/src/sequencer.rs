//! The room's draw order.

use rand::Rng;
use rand::rngs::StdRng;

use crate::{Number, NumberSpace};

/// Produces a random permutation of a [`NumberSpace`], one number at a time.
///
/// Each call to `next` runs one step of an in-place
/// Fisher–Yates shuffle: pick a uniform index from the undrawn tail, swap it
/// to the front of the tail, hand it out. The pool is therefore always split
/// into `drawn` (prefix, in draw order) and `remaining` (suffix), and their
/// union is the whole space.
///
/// A sequencer is single-use. A new game builds a new one.
#[derive(Debug)]
pub struct DrawSequencer<R = StdRng> {
    pool: Vec<Number>,
    cursor: usize,
    rng: R,
}

impl<R: Rng> DrawSequencer<R> {
    /// Creates a sequencer over `space` using `rng`.
    pub fn new(space: &NumberSpace, rng: R) -> Self {
        Self {
            pool: space.iter().collect(),
            cursor: 0,
            rng,
        }
    }

    /// Numbers drawn so far, in draw order.
    pub fn drawn(&self) -> &[Number] {
        &self.pool[..self.cursor]
    }

    /// Numbers not drawn yet, in no particular order.
    pub fn remaining(&self) -> &[Number] {
        &self.pool[self.cursor..]
    }

    /// How many numbers are left.
    pub fn remaining_len(&self) -> usize {
        self.pool.len() - self.cursor
    }

    /// `true` once every number has been drawn.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_len() == 0
    }
}

impl<R: Rng> Iterator for DrawSequencer<R> {
    type Item = Number;

    /// Draws the next number, or `None` once every number has been drawn.
    fn next(&mut self) -> Option<Number> {
        if self.cursor >= self.pool.len() {
            return None;
        }
        let pick = self.rng.random_range(self.cursor..self.pool.len());
        self.pool.swap(self.cursor, pick);
        let number = self.pool[self.cursor];
        self.cursor += 1;
        Some(number)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.remaining_len();
        (left, Some(left))
    }
}
