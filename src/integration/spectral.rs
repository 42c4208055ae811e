//! Poisson integration on the full rectangle with a discrete cosine transform.
//!
//! The divergence of the gradient field is built with central differences
//! and zero-flux edge terms, so the DCT-II diagonalizes the five-point
//! Laplacian with reflecting borders. In the transform domain the solve is a
//! per-coefficient division by the Laplacian eigenvalue
//! `2 cos(pi u / m) + 2 cos(pi v / n) - 4`.
//!
//! Axis convention: `x` runs along rows (first matrix index), `y` along
//! columns.

use fft2d::slice::dcst::{dct_2d, idct_2d};

use super::gradient::GradientField;
use crate::error::{Error, Result};
use crate::grid::finite_diff::{central_dx, central_dy};
use crate::observer::{LogObserver, Observer};
use crate::settings::{SpectralSettings, ZeroFrequency};
use crate::types::{DepthMap, Grid, Mask, NormalField};

#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralIntegrator {
    pub settings: SpectralSettings,
}

impl SpectralIntegrator {
    pub fn new(settings: SpectralSettings) -> Self {
        Self { settings }
    }

    /// Integrate `field` over the rectangle; gradients outside `mask` are
    /// zeroed and the depth there is reported as `NaN`.
    pub fn integrate(&self, field: &NormalField, mask: &Mask) -> Result<DepthMap> {
        self.integrate_observed(field, mask, &mut LogObserver)
    }

    pub fn integrate_observed(
        &self,
        field: &NormalField,
        mask: &Mask,
        observer: &mut dyn Observer,
    ) -> Result<DepthMap> {
        field.check_mask(mask)?;
        let (nrows, ncols) = mask.shape();
        if nrows < 2 || ncols < 2 {
            return Err(Error::InvalidParameter(format!(
                "spectral integration needs at least a 2x2 grid, got {nrows}x{ncols}"
            )));
        }

        let gradients = GradientField::from_normals(field, mask, self.settings.degenerate_eps);
        let pixels = mask.iter().filter(|&&inside| inside).count();
        gradients.report(pixels, observer);

        let f = divergence(&gradients.p, &gradients.q);
        let mut z = dct_poisson(&f, self.settings.zero_frequency);

        for (zv, &inside) in z.iter_mut().zip(mask.iter()) {
            if !inside {
                *zv = f64::NAN;
            }
        }
        Ok(z)
    }
}

/// Divergence `p_x + q_y` with zero-flux boundary terms.
///
/// On the first and last rows the row-direction term becomes
/// `0.5 * (p[0] + p[1])` and `-0.5 * (p[m-1] + p[m-2])`; likewise for the
/// columns with `q`. The tangential term is kept, so corners add both.
pub(crate) fn divergence(p: &Grid, q: &Grid) -> Grid {
    let (m, n) = p.shape();
    let mut px = central_dx(p);
    let mut qy = central_dy(q);

    for j in 0..n {
        px[(0, j)] = 0.5 * (p[(0, j)] + p[(1, j)]);
        px[(m - 1, j)] = -0.5 * (p[(m - 1, j)] + p[(m - 2, j)]);
    }
    for i in 0..m {
        qy[(i, 0)] = 0.5 * (q[(i, 0)] + q[(i, 1)]);
        qy[(i, n - 1)] = -0.5 * (q[(i, n - 1)] + q[(i, n - 2)]);
    }

    px + qy
}

/// Solve `Laplacian(z) = f` with reflecting borders.
fn dct_poisson(f: &Grid, zero_frequency: ZeroFrequency) -> DepthMap {
    let (nrows, ncols) = f.shape();

    // A transposition occurs in dct_2d: the buffer comes back indexed
    // `x * ncols + y`.
    let mut f_cos: Vec<f64> = f.iter().copied().collect();
    dct_2d(nrows, ncols, &mut f_cos);

    let pi = std::f64::consts::PI;
    let coords = coordinates_column_major((nrows, ncols));
    for (f_ij, (x, y)) in f_cos.iter_mut().zip(coords) {
        if x == 0 && y == 0 {
            continue;
        }
        let denom = 2.0 * (pi * x as f64 / nrows as f64).cos()
            + 2.0 * (pi * y as f64 / ncols as f64).cos()
            - 4.0;
        *f_ij /= denom;
    }
    f_cos[0] = match zero_frequency {
        ZeroFrequency::Zero => 0.0,
        ZeroFrequency::NeighborSum => f_cos[ncols] + f_cos[1],
    };

    idct_2d(ncols, nrows, &mut f_cos);

    let dct_norm_coef = 4.0 / (nrows * ncols) as f64;
    DepthMap::from_iterator(nrows, ncols, f_cos.iter().map(|z| dct_norm_coef * z))
}

/// Iterator of the shape (x, y) where y increases first.
fn coordinates_column_major(shape: (usize, usize)) -> impl Iterator<Item = (usize, usize)> {
    let (width, height) = shape;
    (0..width).flat_map(move |x| (0..height).map(move |y| (x, y)))
}

/// One-shot spectral integration with default settings.
pub fn spectral_integrate(field: &NormalField, mask: &Mask) -> Result<DepthMap> {
    SpectralIntegrator::default().integrate(field, mask)
}
