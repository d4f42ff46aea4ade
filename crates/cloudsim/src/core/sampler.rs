//! Random samplers injected into randomized strategies.

use rand::prelude::*;
use rand_pcg::Pcg64;

/// Source of uniformly distributed values in `[0, 1)`.
pub trait Sampler {
    fn sample(&mut self) -> f64;
}

/// Seeded uniform sampler.
pub struct UniformSampler {
    rand: Pcg64,
}

impl UniformSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl Sampler for UniformSampler {
    fn sample(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }
}
