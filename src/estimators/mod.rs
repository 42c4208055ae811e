//! Estimators plugged into the RANSAC pipeline.
//!
//! - [`LightVectorEstimator`]: scaled normal `m` of the Lambertian model
//!   `I = S . m` from intensity/light pairs.

pub mod light_vector;

pub use light_vector::LightVectorEstimator;
