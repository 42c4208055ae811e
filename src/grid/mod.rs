//! Pixel-grid machinery shared by the smoothers and integrators.
//!
//! - [`boundary`]: row-major arena of mask pixels with Neumann-reflected
//!   neighbor links.
//! - [`finite_diff`]: central differences, five-point Laplacian, Dirichlet
//!   energy.
//! - [`sphere`]: tangent projection and exponential map on the unit sphere.

pub mod boundary;
pub mod finite_diff;
pub mod sphere;

pub use boundary::{BoundaryIndex, Direction, InteriorPixel, Neighbors};
