//! Deterministic pre-rolled random source.
//!
//! A fixed table of values is rolled once from the seed. Draws only move a
//! cursor over the table, so the replayable state of the generator is the
//! cursor alone: restoring `(seed, cursor)` reproduces every later draw.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of values rolled up front.
pub const PRE_ROLLS: usize = 128;

/// Pre-rolled random sequence with a replayable cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRolledRng {
    seed: u64,
    cursor: u16,
    rolls: [u32; PRE_ROLLS],
}

impl PreRolledRng {
    /// Roll the table for `seed` with the cursor at zero.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut source = ChaCha8Rng::seed_from_u64(seed);
        let mut rolls = [0u32; PRE_ROLLS];
        for roll in &mut rolls {
            // Keep values in the non-negative 31-bit range.
            *roll = source.next_u32() >> 1;
        }
        Self {
            seed,
            cursor: 0,
            rolls,
        }
    }

    /// Rebuild the generator for `seed` and resume at `cursor`.
    #[must_use]
    pub fn restore(seed: u64, cursor: u16) -> Self {
        let mut rng = Self::new(seed);
        rng.cursor = cursor % PRE_ROLLS as u16;
        rng
    }

    /// Seed the table was rolled from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current cursor position.
    #[must_use]
    pub const fn cursor(&self) -> u16 {
        self.cursor
    }

    /// Advance the cursor and return the value under it.
    pub fn next(&mut self) -> u32 {
        self.cursor = (self.cursor + 1) % PRE_ROLLS as u16;
        self.rolls[usize::from(self.cursor)]
    }

    /// Draw a value in `0..max`. A `max` of zero is treated as one.
    pub fn next_below(&mut self, max: u32) -> u32 {
        self.next() % max.max(1)
    }

    /// Draw an index in `0..len`.
    pub fn next_index(&mut self, len: usize) -> usize {
        let max = u32::try_from(len).unwrap_or(u32::MAX);
        self.next_below(max) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PreRolledRng::new(42);
        let mut b = PreRolledRng::new(42);
        for _ in 0..300 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = PreRolledRng::new(1);
        let b = PreRolledRng::new(2);
        assert_ne!(a.rolls, b.rolls);
    }

    #[test]
    fn test_values_non_negative_31_bit() {
        let mut rng = PreRolledRng::new(7);
        for _ in 0..PRE_ROLLS {
            assert!(rng.next() <= i32::MAX as u32);
        }
    }

    #[test]
    fn test_first_draw_skips_slot_zero_and_wraps() {
        let mut rng = PreRolledRng::new(9);
        let table = rng.rolls;
        assert_eq!(rng.next(), table[1]);
        assert_eq!(rng.cursor(), 1);
        for _ in 0..PRE_ROLLS - 2 {
            rng.next();
        }
        assert_eq!(rng.cursor(), 127);
        assert_eq!(rng.next(), table[0]);
        assert_eq!(rng.cursor(), 0);
    }

    #[test]
    fn test_restore_resumes_sequence() {
        let mut original = PreRolledRng::new(1234);
        for _ in 0..37 {
            original.next();
        }
        let mut restored = PreRolledRng::restore(original.seed(), original.cursor());
        assert_eq!(restored, original);
        for _ in 0..10 {
            assert_eq!(restored.next_below(6), original.next_below(6));
        }
    }

    #[test]
    fn test_next_below_bounds() {
        let mut rng = PreRolledRng::new(3);
        for max in 1..20 {
            assert!(rng.next_below(max) < max);
        }
        assert_eq!(rng.next_below(0), 0);
        assert!(rng.next_index(5) < 5);
    }
}
