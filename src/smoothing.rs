//! Manifold-constrained smoothing of normal fields.
//!
//! Both operators run explicit gradient descent on the unit sphere: at every
//! mask pixel a descent direction is formed, projected onto the tangent
//! plane, scaled by `tau` and followed along a great circle with the
//! exponential map, so the iterates stay unit length.
//!
//! - [`NormalFieldSmoother::smooth`] descends the Dirichlet energy (harmonic
//!   map heat flow).
//! - [`NormalFieldSmoother::regularize`] adds a fidelity term pulling each
//!   normal toward a reference field along the geodesic.

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::grid::finite_diff::{dirichlet_energy, vector_laplacian};
use crate::grid::sphere::{exp_map, geodesic_distance, project_orthogonal};
use crate::grid::BoundaryIndex;
use crate::observer::{Event, LogObserver, Observer};
use crate::settings::{RegularizationSettings, SmoothingSettings};
use crate::types::{ensure_shape, Mask, NormalField};

/// Smoother bound to one mask. The arena is built once and reused by every
/// call.
#[derive(Debug, Clone)]
pub struct NormalFieldSmoother {
    index: BoundaryIndex,
}

impl NormalFieldSmoother {
    pub fn new(mask: &Mask) -> Self {
        Self::with_index(BoundaryIndex::from_mask(mask))
    }

    pub fn with_index(index: BoundaryIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &BoundaryIndex {
        &self.index
    }

    /// Harmonic smoothing. Pixels outside the mask keep their input values.
    pub fn smooth(&self, field: &NormalField, settings: &SmoothingSettings) -> Result<NormalField> {
        self.smooth_observed(field, settings, &mut LogObserver)
    }

    pub fn smooth_observed(
        &self,
        field: &NormalField,
        settings: &SmoothingSettings,
        observer: &mut dyn Observer,
    ) -> Result<NormalField> {
        ensure_shape("normal field", self.index.shape(), field.shape())?;
        check_step(settings.tau, settings.exp_eps)?;

        let mut n = self.index.gather_field(field);
        let energy_before = dirichlet_energy(&self.index, &n);

        for it in 0..settings.iterations {
            let lap = vector_laplacian(&self.index, &n);
            let mut max_step = 0.0f64;
            for (nk, lk) in n.iter_mut().zip(&lap) {
                let step = project_orthogonal(lk, nk) * settings.tau;
                max_step = max_step.max(step.norm());
                *nk = exp_map(&step, nk, settings.exp_eps);
            }
            observer.notify(&Event::SmoothingStep {
                iteration: it + 1,
                iterations: settings.iterations,
                max_step,
            });
        }

        observer.notify(&Event::SmoothingFinished {
            energy_before,
            energy_after: dirichlet_energy(&self.index, &n),
        });

        let mut out = field.clone();
        self.index.scatter_field(&n, &mut out);
        Ok(out)
    }

    /// Regularize `field` toward `reference`. Passing the same field twice
    /// smooths the data while tying it to itself.
    pub fn regularize(
        &self,
        field: &NormalField,
        reference: &NormalField,
        settings: &RegularizationSettings,
    ) -> Result<NormalField> {
        self.regularize_observed(field, reference, settings, &mut LogObserver)
    }

    /// Start from `field` and descend
    /// `-Laplacian(n) + mu * grad_n d(n, reference)^2 / 2`.
    ///
    /// The fidelity gradient `d / sin(d) * reference` (with `d` the arc length
    /// to the reference) is dropped at pixels where `n . reference > 1 - eps`
    /// or `1 - (n . reference)^2 < eps`.
    pub fn regularize_observed(
        &self,
        field: &NormalField,
        reference: &NormalField,
        settings: &RegularizationSettings,
        observer: &mut dyn Observer,
    ) -> Result<NormalField> {
        ensure_shape("normal field", self.index.shape(), field.shape())?;
        ensure_shape("reference field", self.index.shape(), reference.shape())?;
        check_step(settings.tau, settings.exp_eps)?;
        if !settings.mu.is_finite() || settings.mu < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "fidelity weight must be finite and non-negative, got {}",
                settings.mu
            )));
        }

        let n0 = self.index.gather_field(reference);
        let mut n = self.index.gather_field(field);
        let energy_before = dirichlet_energy(&self.index, &n);

        for it in 0..settings.iterations {
            let lap = vector_laplacian(&self.index, &n);
            let mut max_step = 0.0f64;
            let mut unstable = 0usize;
            for ((nk, lk), n0k) in n.iter_mut().zip(&lap).zip(&n0) {
                let (dterm, stable) = fidelity_weight(nk, n0k, settings.eps);
                if !stable {
                    unstable += 1;
                }
                let direction: Vector3<f64> = n0k * (settings.mu * dterm) + lk;
                let step = project_orthogonal(&direction, nk) * settings.tau;
                max_step = max_step.max(step.norm());
                *nk = exp_map(&step, nk, settings.exp_eps);
            }
            observer.notify(&Event::RegularizationStep {
                iteration: it + 1,
                iterations: settings.iterations,
                max_step,
                unstable,
            });
        }

        observer.notify(&Event::SmoothingFinished {
            energy_before,
            energy_after: dirichlet_energy(&self.index, &n),
        });

        let mut out = field.clone();
        self.index.scatter_field(&n, &mut out);
        Ok(out)
    }
}

/// `arccos(c) / sqrt(1 - c^2)` for `c = n . n0`, or `0` where that ratio is
/// numerically unstable. The flag is `false` in the latter case.
fn fidelity_weight(n: &Vector3<f64>, n0: &Vector3<f64>, eps: f64) -> (f64, bool) {
    let c = n.dot(n0).clamp(-1.0, 1.0);
    let s2 = 1.0 - c * c;
    if c > 1.0 - eps || s2 < eps {
        return (0.0, false);
    }
    (geodesic_distance(n, n0) / s2.sqrt(), true)
}

fn check_step(tau: f64, exp_eps: f64) -> Result<()> {
    if !tau.is_finite() || tau < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "descent step must be finite and non-negative, got {tau}"
        )));
    }
    if exp_eps.is_nan() || exp_eps <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "exponential map threshold must be positive, got {exp_eps}"
        )));
    }
    Ok(())
}

/// One-shot [`NormalFieldSmoother::smooth`] for a single mask.
pub fn smooth_normal_field(
    field: &NormalField,
    mask: &Mask,
    settings: &SmoothingSettings,
) -> Result<NormalField> {
    field.check_mask(mask)?;
    NormalFieldSmoother::new(mask).smooth(field, settings)
}

/// One-shot [`NormalFieldSmoother::regularize`] for a single mask.
pub fn regularize_normal_field(
    field: &NormalField,
    reference: &NormalField,
    mask: &Mask,
    settings: &RegularizationSettings,
) -> Result<NormalField> {
    field.check_mask(mask)?;
    reference.check_mask(mask)?;
    NormalFieldSmoother::new(mask).regularize(field, reference, settings)
}
