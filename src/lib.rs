//! # Photostereo - Photometric Stereo Reconstruction
//!
//! `photostereo` turns per-pixel photometric measurements into surfaces:
//! robust estimation of the scaled normal `m = albedo * n` from intensities
//! under known lights, intrinsic smoothing of the resulting normal field on
//! the unit sphere, and integration of the normal field into a depth map.
//!
//! ## Quick Start
//!
//! Fit the scaled normal of one pixel with RANSAC, ignoring an outlier
//! intensity:
//!
//! ```rust
//! use photostereo::{estimate_light_vector, LightMeasurements};
//! use nalgebra::{DMatrix, DVector, Vector3};
//!
//! // Eight lights on a cone around the viewing axis.
//! let lights = DMatrix::from_fn(8, 3, |k, c| {
//!     let a = k as f64 * std::f64::consts::FRAC_PI_4;
//!     [0.6 * a.cos(), 0.6 * a.sin(), 0.8][c]
//! });
//! let m = Vector3::new(0.1, -0.2, 0.9);
//! let mut intensities = DVector::from_fn(8, |k, _| {
//!     Vector3::new(lights[(k, 0)], lights[(k, 1)], lights[(k, 2)]).dot(&m)
//! });
//! intensities[7] += 0.5; // specular highlight
//!
//! let data = LightMeasurements::new(intensities, lights).unwrap();
//! let result = estimate_light_vector(&data, 1e-6, None, 7).unwrap();
//! assert_eq!(result.inliers, vec![0, 1, 2, 3, 4, 5, 6]);
//! assert!((result.model.m - m).norm() < 1e-9);
//! ```
//!
//! Integrate a normal field over a mask:
//!
//! ```rust
//! use photostereo::{unbiased_integrate, IntegrationOrder, Mask, NormalField};
//! use nalgebra::Vector3;
//!
//! let normals = NormalField::constant(16, 16, Vector3::new(0.1, -0.2, 1.0).normalize());
//! let mask = Mask::from_fn(16, 16, |r, c| (r as i32 - 8).pow(2) + (c as i32 - 8).pow(2) < 40);
//!
//! let depth = unbiased_integrate(&normals, &mask, IntegrationOrder::Second).unwrap();
//! assert!(depth[(0, 0)].is_nan());
//! assert!(depth[(8, 8)].is_finite());
//! ```
//!
//! ## Pipeline
//!
//! 1. [`photometric`]: per-pixel normals and albedo from an image stack,
//!    by least squares or robustly through the RANSAC core.
//! 2. [`smoothing`]: harmonic diffusion of the normal field on the sphere,
//!    optionally tied to the data by a geodesic fidelity term.
//! 3. [`integration`]: depth from normals, either on an arbitrary mask
//!    ([`UnbiasedIntegrator`]) or on the full rectangle
//!    ([`SpectralIntegrator`]).
//!
//! Every stage has a plain entry point logging through the `log` facade and
//! an `*_observed` variant taking an [`Observer`].
//!
//! ## Extending the Library
//!
//! The RANSAC core is generic over the traits in [`core`]:
//!
//! - **[`Estimator`](core::Estimator)**: hypotheses from minimal samples and refits
//! - **[`Sampler`](core::Sampler)**: minimal sample drawing
//! - **[`Scoring<M>`](core::Scoring)**: consensus sets and their ordering
//! - **[`LocalOptimizer<M, S>`](core::LocalOptimizer)**: refinement of new best models
//! - **[`TerminationCriterion<S>`](core::TerminationCriterion)**: trial budget
//!
//! The integrators solve their sparse systems through
//! [`SparseSolver`](integration::SparseSolver), which can be implemented for
//! other back ends.
//!
//! ### Example: Custom Sampler
//!
//! ```rust
//! use photostereo::core::Sampler;
//! use photostereo::types::DataMatrix;
//!
//! /// Walks the data in consecutive windows.
//! struct SlidingSampler {
//!     start: usize,
//! }
//!
//! impl Sampler for SlidingSampler {
//!     fn sample(&mut self, data: &DataMatrix, sample_size: usize, out: &mut [usize]) -> bool {
//!         let n = data.nrows();
//!         if sample_size > n {
//!             return false;
//!         }
//!         for (k, slot) in out.iter_mut().take(sample_size).enumerate() {
//!             *slot = (self.start + k) % n;
//!         }
//!         self.start += 1;
//!         true
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - **[`api`](api)**: High-level robust estimation entry points
//! - **[`core`](core)**: Core traits and the `Ransac` pipeline
//! - **[`estimators`](estimators)**: The light-vector estimator
//! - **[`samplers`](samplers)**: Uniform sampling
//! - **[`scoring`](scoring)**: Inlier-count scoring
//! - **[`models`](models)**: Model types
//! - **[`grid`](grid)**: Mask arena, finite differences and sphere geometry
//! - **[`smoothing`](smoothing)**: Normal-field smoothing and regularization
//! - **[`integration`](integration)**: Poisson integrators and sparse solvers
//! - **[`photometric`](photometric)**: Per-pixel photometric stereo
//! - **[`settings`](settings)**: Configuration types
//! - **[`observer`](observer)**: Progress and diagnostics events

pub mod api;
pub mod core;
pub mod error;
pub mod estimators;
pub mod grid;
pub mod integration;
pub mod models;
pub mod observer;
pub mod photometric;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod smoothing;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{
    estimate_light_vector, estimate_light_vector_observed, estimate_light_vector_with_rng,
    EstimationResult,
};
pub use integration::{
    spectral_integrate, unbiased_integrate, SpectralIntegrator, UnbiasedIntegrator,
};
pub use photometric::{least_squares_normals, ransac_normals, RansacReconstruction, Reconstruction};
pub use smoothing::{regularize_normal_field, smooth_normal_field, NormalFieldSmoother};

// Re-export core traits for easy access
pub use core::{Estimator, LocalOptimizer, Sampler, Scoring, TerminationCriterion};

pub use error::{Error, Result};
pub use models::ScaledNormal;
pub use observer::{Event, LogObserver, NoopObserver, Observer, RecordingObserver};
pub use settings::{
    DegeneratePolicy, IntegrationOrder, PoissonSettings, RansacSettings, RegularizationSettings,
    SmoothingSettings, SolverKind, SpectralSettings, ZeroFrequency,
};
pub use types::{DepthMap, Grid, LightMeasurements, Mask, NormalField};
