//! Deterministic random number generation.
//!
//! Xoshiro256** seeded from a `u64`: the same seed always yields the same
//! fault sequence, so a failing simulation can be replayed exactly.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Seeded PRNG that counts how often it is consulted.
pub struct DeterministicRng {
    seed: u64,
    rng: Xoshiro256StarStar,
    calls_count: u64,
}

impl DeterministicRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        debug_assert!(seed != 0, "Seed should not be zero for better randomness");

        Self {
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            calls_count: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn calls_count(&self) -> u64 {
        self.calls_count
    }

    /// Next raw `u64`.
    pub fn next_u64(&mut self) -> u64 {
        self.calls_count += 1;
        self.rng.gen()
    }

    /// `true` with the given probability.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        debug_assert!(
            (0.0..=1.0).contains(&probability),
            "Probability must be in [0.0, 1.0]"
        );
        self.calls_count += 1;
        self.rng.gen_bool(probability)
    }

    /// Derive an independent RNG for a sub-component.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        // Keep derived seeds non-zero
        let seed = self.next_u64().max(1);
        Self::new(seed)
    }
}
