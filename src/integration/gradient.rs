//! Depth gradients from surface normals.
//!
//! With `n = (n1, n2, n3)` the depth gradient along rows is `p = -n2 / n3`
//! and along columns `q = -n1 / n3`. The division is guarded: a normal
//! lying (almost) in the image plane has no finite gradient.

use crate::observer::{Event, Observer};
use crate::types::{Grid, Mask, NormalField};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gradient {
    Valid { p: f64, q: f64 },
    /// `|n3|` below the threshold, or a non-finite component.
    Degenerate,
}

impl Gradient {
    pub fn from_normal(n1: f64, n2: f64, n3: f64, eps: f64) -> Self {
        if !(n1.is_finite() && n2.is_finite() && n3.is_finite()) || n3.abs() < eps {
            return Gradient::Degenerate;
        }
        let p = -n2 / n3;
        let q = -n1 / n3;
        if p.is_finite() && q.is_finite() {
            Gradient::Valid { p, q }
        } else {
            Gradient::Degenerate
        }
    }

    /// `(p, q)`, with a flat `(0, 0)` surrogate for degenerate normals.
    #[inline]
    pub fn or_flat(self) -> (f64, f64) {
        match self {
            Gradient::Valid { p, q } => (p, q),
            Gradient::Degenerate => (0.0, 0.0),
        }
    }
}

/// Gradient grids of a normal field, zero outside the mask.
#[derive(Debug, Clone)]
pub struct GradientField {
    pub p: Grid,
    pub q: Grid,
    /// Mask pixels that received the flat surrogate.
    pub degenerate: usize,
    /// `true` at exactly those pixels.
    pub degenerate_pixels: Mask,
}

impl GradientField {
    /// Shapes must already have been checked by the caller.
    pub fn from_normals(field: &NormalField, mask: &Mask, eps: f64) -> Self {
        let (m, n) = field.shape();
        let mut p = Grid::zeros(m, n);
        let mut q = Grid::zeros(m, n);
        let mut degenerate = 0;
        let mut degenerate_pixels = Mask::from_element(m, n, false);

        for j in 0..n {
            for i in 0..m {
                if !mask[(i, j)] {
                    continue;
                }
                let g = Gradient::from_normal(
                    field.n1[(i, j)],
                    field.n2[(i, j)],
                    field.n3[(i, j)],
                    eps,
                );
                if g == Gradient::Degenerate {
                    degenerate += 1;
                    degenerate_pixels[(i, j)] = true;
                }
                let (pv, qv) = g.or_flat();
                p[(i, j)] = pv;
                q[(i, j)] = qv;
            }
        }

        Self {
            p,
            q,
            degenerate,
            degenerate_pixels,
        }
    }

    /// `mask` with the degenerate pixels removed.
    pub fn valid_mask(&self, mask: &Mask) -> Mask {
        mask.zip_map(&self.degenerate_pixels, |inside, bad| inside && !bad)
    }

    /// Report the degenerate count, if any.
    pub(crate) fn report(&self, pixels: usize, observer: &mut dyn Observer) {
        if self.degenerate > 0 {
            observer.notify(&Event::DegenerateNormals {
                count: self.degenerate,
                pixels,
            });
        }
    }
}
