//! Masked Poisson integration on an arbitrary pixel domain.
//!
//! One unknown per mask pixel. For every pair of 4-adjacent mask pixels the
//! depth difference is tied to the gradient flux through the interface
//! between them; interfaces with a pixel outside the mask carry no equation,
//! which is the natural (zero-flux) boundary condition. The resulting system
//! is the graph Laplacian of the mask, made definite by a tiny multiple of
//! the identity.
//!
//! Pixels whose normal has no finite gradient either keep a flat surrogate
//! or, under [`DegeneratePolicy::Exclude`], leave the domain altogether.

use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use super::gradient::GradientField;
use super::solver::solver_for;
use crate::error::{Error, Result};
use crate::grid::{BoundaryIndex, Direction};
use crate::observer::{Event, LogObserver, Observer};
use crate::settings::{DegeneratePolicy, IntegrationOrder, PoissonSettings};
use crate::types::{DepthMap, Grid, Mask, NormalField};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnbiasedIntegrator {
    pub settings: PoissonSettings,
}

impl UnbiasedIntegrator {
    pub fn new(settings: PoissonSettings) -> Self {
        Self { settings }
    }

    /// Integrate `field` over `mask`. The result is `NaN` outside the mask (and
    /// at excluded degenerate pixels) and defined up to an additive constant
    /// per connected component.
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
        let index = BoundaryIndex::from_mask(mask);
        self.integrate_with_index(field, mask, &index, observer)
    }

    /// Same as [`integrate_observed`](Self::integrate_observed) with a
    /// prebuilt arena for `mask`.
    pub fn integrate_with_index(
        &self,
        field: &NormalField,
        mask: &Mask,
        index: &BoundaryIndex,
        observer: &mut dyn Observer,
    ) -> Result<DepthMap> {
        field.check_mask(mask)?;
        crate::types::ensure_shape("boundary index", mask.shape(), index.shape())?;
        let reg = self.settings.regularization;
        if !reg.is_finite() || reg < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "regularization must be finite and non-negative, got {reg}"
            )));
        }

        let (m, n) = mask.shape();
        if index.is_empty() {
            return Ok(DepthMap::from_element(m, n, f64::NAN));
        }

        let gradients = GradientField::from_normals(field, mask, self.settings.degenerate_eps);
        gradients.report(index.len(), observer);

        let reduced;
        let index = match self.settings.degenerate_policy {
            DegeneratePolicy::Exclude if gradients.degenerate > 0 => {
                reduced = BoundaryIndex::from_mask(&gradients.valid_mask(mask));
                debug!(
                    "excluded {} degenerate pixels, {} unknowns remain",
                    gradients.degenerate,
                    reduced.len()
                );
                if reduced.is_empty() {
                    return Ok(DepthMap::from_element(m, n, f64::NAN));
                }
                &reduced
            }
            _ => index,
        };

        let (a, b) = assemble(index, &gradients, self.settings.order, reg);
        observer.notify(&Event::SystemAssembled {
            unknowns: index.len(),
            nonzeros: a.nnz(),
        });

        let solver = solver_for(self.settings.solver);
        let solution = solver.solve(&a, &b).map_err(|e| {
            let (first, last) = index.bounding_box().unwrap_or(((0, 0), (0, 0)));
            Error::LinearSolve {
                rows: m,
                cols: n,
                pixels: index.len(),
                first,
                last,
                reason: e.to_string(),
            }
        })?;
        observer.notify(&Event::SolverFinished {
            iterations: solution.iterations,
            residual: solution.residual,
        });

        Ok(index.scatter(solution.x.as_slice(), f64::NAN))
    }
}

/// Interface fluxes `(pbar, qbar)`: `pbar[i, j]` lives between rows `i` and
/// `i + 1`, `qbar[i, j]` between columns `j` and `j + 1`.
fn interface_fluxes(gradients: &GradientField, order: IntegrationOrder) -> (Grid, Grid) {
    let p = &gradients.p;
    let q = &gradients.q;
    match order {
        IntegrationOrder::First => (p.clone(), q.clone()),
        IntegrationOrder::Second => {
            let (m, n) = p.shape();
            let pbar = Grid::from_fn(m, n, |i, j| 0.5 * (p[(i, j)] + p[((i + 1).min(m - 1), j)]));
            let qbar = Grid::from_fn(m, n, |i, j| 0.5 * (q[(i, j)] + q[(i, (j + 1).min(n - 1))]));
            (pbar, qbar)
        }
    }
}

/// Assemble `A z = b`: for every mask pixel `k` and each neighbor `k'` that
/// is also in the mask, `A[k, k] += 1`, `A[k, k'] -= 1` and the flux through
/// the shared interface enters `b[k]`.
pub(crate) fn assemble(
    index: &BoundaryIndex,
    gradients: &GradientField,
    order: IntegrationOrder,
    regularization: f64,
) -> (CscMatrix<f64>, DVector<f64>) {
    let (pbar, qbar) = interface_fluxes(gradients, order);
    let n = index.len();
    let mut coo = CooMatrix::new(n, n);
    let mut b = DVector::zeros(n);

    for (k, px) in index.pixels().iter().enumerate() {
        let (i, j) = (px.row, px.col);
        for (dir, nbr) in px.true_neighbors(k) {
            coo.push(k, k, 1.0);
            coo.push(k, nbr, -1.0);
            match dir {
                Direction::Right => b[k] -= qbar[(i, j)],
                Direction::Left => b[k] += qbar[(i, j - 1)],
                Direction::Up => b[k] += pbar[(i - 1, j)],
                Direction::Down => b[k] -= pbar[(i, j)],
            }
        }
        if regularization > 0.0 {
            coo.push(k, k, regularization);
        }
    }

    (CscMatrix::from(&coo), b)
}

/// One-shot masked integration with default settings and the given order.
pub fn unbiased_integrate(
    field: &NormalField,
    mask: &Mask,
    order: IntegrationOrder,
) -> Result<DepthMap> {
    UnbiasedIntegrator::new(PoissonSettings {
        order,
        ..PoissonSettings::default()
    })
    .integrate(field, mask)
}
