//! Uniform random sampler drawing minimal samples without replacement.

use rand::rngs::StdRng;
use rand::RngCore;

use crate::core::Sampler;
use crate::types::DataMatrix;
use crate::utils::UniformRandomGenerator;

/// Uniform random sampler drawing minimal samples without replacement.
pub struct UniformRandomSampler<R = StdRng> {
    rng: UniformRandomGenerator<R>,
}

impl UniformRandomSampler<StdRng> {
    /// Construct a sampler from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: UniformRandomGenerator::from_seed(seed),
        }
    }
}

impl<R: RngCore> UniformRandomSampler<R> {
    /// Draw from a caller-owned generator, e.g. `&mut StdRng`.
    pub fn from_rng(rng: R) -> Self {
        Self {
            rng: UniformRandomGenerator::from_rng(rng),
        }
    }
}

impl<R: RngCore> Sampler for UniformRandomSampler<R> {
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool {
        let n = data.nrows();
        if sample_size == 0 || n == 0 || sample_size > n || out_indices.len() < sample_size {
            return false;
        }

        self.rng
            .gen_unique(&mut out_indices[..sample_size], 0, n - 1);
        true
    }
}
