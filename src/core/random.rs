//! Seedable randomness for target selection, wandering, yields and spawn splits
//!
//! Everything random in the colony goes through [`RandomSource`] so a run can
//! be replayed from its seed, or made fully deterministic in tests with
//! [`FirstPick`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Uniform index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;

    /// Uniform integer in `lo..=hi`
    fn between(&mut self, lo: i32, hi: i32) -> i32;

    /// Uniform float in `[0, 1)`
    fn unit(&mut self) -> f32;
}

/// Choose one element of `items`, `None` when empty
pub fn choose<T: Copy>(random: &mut dyn RandomSource, items: &[T]) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let idx = random.pick(items.len()).min(items.len() - 1);
    items.get(idx).copied()
}

/// ChaCha8-backed random source
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }

    fn between(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    fn unit(&mut self) -> f32 {
        self.rng.gen()
    }
}

/// Deterministic source: always the first candidate, the low bound, and zero
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPick;

impl RandomSource for FirstPick {
    fn pick(&mut self, _len: usize) -> usize {
        0
    }

    fn between(&mut self, lo: i32, _hi: i32) -> i32 {
        lo
    }

    fn unit(&mut self) -> f32 {
        0.0
    }
}
