//! Normal-field integration into depth maps.
//!
//! - [`unbiased`]: sparse Poisson system over an arbitrary mask.
//! - [`spectral`]: DCT Poisson solver on the full rectangle.
//! - [`solver`]: sparse Cholesky and preconditioned conjugate gradient.
//! - [`gradient`]: guarded normal-to-gradient conversion.
//!
//! On a full rectangular mask both integrators solve the same discrete
//! system, so their results agree up to an additive constant.

pub mod gradient;
pub mod solver;
pub mod spectral;
pub mod unbiased;

pub use gradient::{Gradient, GradientField};
pub use solver::{
    CholeskySolver, ConjugateGradientSolver, Solution, SolveError, SparseSolver,
};
pub use spectral::{spectral_integrate, SpectralIntegrator};
pub use unbiased::{unbiased_integrate, UnbiasedIntegrator};
