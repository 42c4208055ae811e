//! Seeded random-number helpers and small dense linear-algebra routines.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rand::distr::uniform::SampleUniform;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform integer generator drawing from a caller-supplied random source.
///
/// There is no entropy-seeded constructor: every stream is reproducible from
/// its seed, or from the RNG the caller hands in.
pub struct UniformRandomGenerator<R = StdRng> {
    rng: R,
}

impl UniformRandomGenerator<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: RngCore> UniformRandomGenerator<R> {
    /// Wrap an existing generator, e.g. `&mut StdRng` to share one stream.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one value uniformly from `[min, max]`.
    pub fn next_in<T>(&mut self, min: T, max: T) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        self.rng.random_range(min..=max)
    }

    /// Fill `out` with distinct values drawn uniformly from `[min, max]`.
    ///
    /// Rejection sampling; intended for the tiny sample sizes of minimal
    /// solvers. The range must hold at least `out.len()` values.
    pub fn gen_unique<T>(&mut self, out: &mut [T], min: T, max: T)
    where
        T: SampleUniform + PartialOrd + Copy,
    {
        for i in 0..out.len() {
            loop {
                let candidate = self.next_in(min, max);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}

/// Solve the square 3x3 system exactly, `None` when it is singular.
pub fn solve3(a: &Matrix3<f64>, b: &Vector3<f64>) -> Option<Vector3<f64>> {
    a.lu().solve(b)
}

/// Minimum-norm least-squares solution of `a x = b` through the pseudo-inverse.
pub fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let pinv = a.pseudo_inverse(1e-12).ok()?;
    Some(pinv * b)
}
