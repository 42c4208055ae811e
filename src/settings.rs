//! Configuration types for the estimator, the smoothers and the integrators.
//!
//! Every settings struct has a `Default` matching the documented defaults and
//! deserializes with missing fields filled from that default, so a partial
//! JSON/TOML document is a valid configuration.

use serde::{Deserialize, Serialize};

/// Settings for the robust light-vector estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacSettings {
    /// Attempts at drawing a well-conditioned minimal sample per trial.
    pub max_data_tries: usize,
    /// Initial trial budget; the adaptive stopping rule only ever lowers it.
    pub max_iterations: usize,
    /// Desired probability of drawing at least one all-inlier sample.
    pub confidence: f64,
    /// Minimal `|det|` of the 3x3 light sub-matrix for a sample to be used.
    pub det_threshold: f64,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            max_data_tries: 100,
            max_iterations: 1000,
            confidence: 0.9,
            det_threshold: 0.1,
        }
    }
}

/// Pure harmonic smoothing of a normal field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    pub iterations: usize,
    /// Descent step.
    pub tau: f64,
    /// Tangent vectors shorter than this leave the point unchanged.
    pub exp_eps: f64,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            tau: 0.05,
            exp_eps: 1e-7,
        }
    }
}

/// Smoothing with a geodesic-distance fidelity term (sphere Tikhonov).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizationSettings {
    /// Weight of the fidelity term.
    pub mu: f64,
    pub iterations: usize,
    pub tau: f64,
    /// Fidelity is dropped where `n . n0 > 1 - eps`.
    pub eps: f64,
    pub exp_eps: f64,
}

impl Default for RegularizationSettings {
    fn default() -> Self {
        Self {
            mu: 1.0,
            iterations: 10,
            tau: 0.05,
            eps: 1e-7,
            exp_eps: 1e-7,
        }
    }
}

/// Flux discretization used by the masked Poisson integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationOrder {
    /// Pixel gradients used directly as interface fluxes.
    First,
    /// Interface fluxes averaged from the two adjacent pixels.
    #[default]
    Second,
}

impl TryFrom<u8> for IntegrationOrder {
    type Error = crate::error::Error;

    fn try_from(order: u8) -> Result<Self, Self::Error> {
        match order {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(crate::error::Error::InvalidParameter(format!(
                "integration order must be 1 or 2, got {other}"
            ))),
        }
    }
}

/// Sparse solver back end for the masked Poisson system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Sparse Cholesky factorization.
    #[default]
    Cholesky,
    /// Jacobi-preconditioned conjugate gradient.
    ConjugateGradient { max_iterations: usize, tolerance: f64 },
}

/// Treatment of mask pixels whose normal has no finite depth gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegeneratePolicy {
    /// Substitute a zero gradient and keep the pixel as an unknown.
    #[default]
    Flat,
    /// Drop the pixel from the domain; its depth is `NaN`.
    Exclude,
}

/// Settings for the masked (unbiased) Poisson integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoissonSettings {
    pub order: IntegrationOrder,
    /// Multiple of the identity added to the assembled Laplacian.
    pub regularization: f64,
    /// Normals with `|n3|` below this are treated as degenerate.
    pub degenerate_eps: f64,
    pub degenerate_policy: DegeneratePolicy,
    pub solver: SolverKind,
}

impl Default for PoissonSettings {
    fn default() -> Self {
        Self {
            order: IntegrationOrder::Second,
            regularization: 1e-9,
            degenerate_eps: 1e-8,
            degenerate_policy: DegeneratePolicy::Flat,
            solver: SolverKind::Cholesky,
        }
    }
}

/// How the undetermined DC coefficient of the spectral solution is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroFrequency {
    /// Force the coefficient to zero.
    #[default]
    Zero,
    /// Use the sum of the two lowest non-DC coefficients.
    NeighborSum,
}

/// Settings for the spectral (DCT) integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralSettings {
    pub degenerate_eps: f64,
    pub zero_frequency: ZeroFrequency,
}

impl Default for SpectralSettings {
    fn default() -> Self {
        Self {
            degenerate_eps: 1e-8,
            zero_frequency: ZeroFrequency::Zero,
        }
    }
}
