//! Sampling strategies for the RANSAC pipeline.

pub mod uniform;

pub use uniform::UniformRandomSampler;
