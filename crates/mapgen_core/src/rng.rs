//! Seeded random source for map generation.
//!
//! Every stochastic step draws from a single [`MapRng`], so a seed plus a
//! configuration fully determines the generated map. ChaCha8 is used
//! because its output stream is specified and portable across platforms
//! and `rand` releases.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG for map generation.
#[derive(Debug, Clone)]
pub struct MapRng {
    inner: ChaCha8Rng,
}

impl MapRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[0, n)`. Returns 0 when `n` is 0.
    pub fn uniform(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.inner.gen_range(0..n)
    }

    /// Uniform index into a collection of `len` elements.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    /// True with probability `percent / 100`.
    pub fn percent(&mut self, percent: u32) -> bool {
        self.uniform(100) < percent
    }

    /// True with probability `1 / n`.
    pub fn one_in(&mut self, n: u32) -> bool {
        self.uniform(n) == 0
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}
