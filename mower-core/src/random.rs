//! Random numbers for the random mowing pattern

use nanorand::{Rng, WyRand};

/// Source of uniformly distributed integers
pub trait RandomSource {
    /// Uniform integer in `low..=high`
    fn range_inclusive(&mut self, low: i32, high: i32) -> i32;
}

/// WyRand backed source, seeded explicitly since there is no OS entropy
pub struct WyRandSource {
    rng: WyRand,
}

impl WyRandSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WyRand::new_seed(seed),
        }
    }
}

impl RandomSource for WyRandSource {
    fn range_inclusive(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        // nanorand's signed ranges are off by one, so draw the span unsigned
        let span = high.abs_diff(low);
        low.wrapping_add(self.rng.generate_range(0..=span) as i32)
    }
}
