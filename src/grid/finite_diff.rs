//! Finite differences on full grids and on arena fields.
//!
//! - Full grids clamp the index at the border, so the first and last samples
//!   along an axis see a one-sided half difference.
//! - Arena fields use the Neumann-reflected neighbor links of a
//!   [`BoundaryIndex`], so a pixel whose neighbor lies outside the mask
//!   differences against itself.

use nalgebra::Vector3;

use super::boundary::BoundaryIndex;
use crate::types::Grid;

/// Central difference along axis 0 (rows): `0.5 * (f[i+1, j] - f[i-1, j])`.
pub fn central_dx(f: &Grid) -> Grid {
    let (m, n) = f.shape();
    Grid::from_fn(m, n, |i, j| {
        let up = i.saturating_sub(1);
        let down = (i + 1).min(m - 1);
        0.5 * (f[(down, j)] - f[(up, j)])
    })
}

/// Central difference along axis 1 (columns): `0.5 * (f[i, j+1] - f[i, j-1])`.
pub fn central_dy(f: &Grid) -> Grid {
    let (m, n) = f.shape();
    Grid::from_fn(m, n, |i, j| {
        let left = j.saturating_sub(1);
        let right = (j + 1).min(n - 1);
        0.5 * (f[(i, right)] - f[(i, left)])
    })
}

/// Five-point Laplacian `N[up] + N[down] + N[left] + N[right] - 4 N` of a
/// vector field over the arena.
pub fn vector_laplacian(index: &BoundaryIndex, values: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    index
        .pixels()
        .iter()
        .zip(values)
        .map(|(px, v)| {
            let nb = &px.neighbors;
            values[nb.up] + values[nb.down] + values[nb.left] + values[nb.right] - v * 4.0
        })
        .collect()
}

/// Discrete Dirichlet energy: the sum of `|N[k'] - N[k]|^2` over every pair
/// of 4-adjacent mask pixels, each pair counted once.
pub fn dirichlet_energy(index: &BoundaryIndex, values: &[Vector3<f64>]) -> f64 {
    index
        .pixels()
        .iter()
        .zip(values)
        .map(|(px, v)| {
            (values[px.neighbors.down] - v).norm_squared()
                + (values[px.neighbors.right] - v).norm_squared()
        })
        .sum()
}
