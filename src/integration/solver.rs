//! Sparse symmetric positive-definite solvers for the Poisson systems.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::CscMatrix;
use thiserror::Error;

use crate::settings::SolverKind;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("system is {rows}x{cols} but the right-hand side has {len} entries")]
    Dimension { rows: usize, cols: usize, len: usize },
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("conjugate gradient stalled after {iterations} iterations (relative residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub x: DVector<f64>,
    pub iterations: usize,
    /// Relative residual `|b - A x| / |b|`.
    pub residual: f64,
}

pub trait SparseSolver {
    fn solve(&self, a: &CscMatrix<f64>, b: &DVector<f64>) -> Result<Solution, SolveError>;
}

/// Direct solve through a sparse Cholesky factorization.
#[derive(Debug, Default, Clone, Copy)]
pub struct CholeskySolver;

impl SparseSolver for CholeskySolver {
    fn solve(&self, a: &CscMatrix<f64>, b: &DVector<f64>) -> Result<Solution, SolveError> {
        check_dims(a, b)?;
        let factor = CscCholesky::factor(a).map_err(|_| SolveError::NotPositiveDefinite)?;
        let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
        let x = factor.solve(&rhs);
        let x = DVector::from_column_slice(x.as_slice());
        let residual = relative_residual(a, &x, b);
        Ok(Solution {
            x,
            iterations: 1,
            residual,
        })
    }
}

/// Conjugate gradient with a Jacobi (diagonal) preconditioner.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradientSolver {
    pub max_iterations: usize,
    /// Stop once `|r| / |b|` drops below this.
    pub tolerance: f64,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-10,
        }
    }
}

impl SparseSolver for ConjugateGradientSolver {
    fn solve(&self, a: &CscMatrix<f64>, b: &DVector<f64>) -> Result<Solution, SolveError> {
        check_dims(a, b)?;
        let n = b.len();

        let inv_diag: Vec<f64> = diagonal(a)
            .into_iter()
            .map(|d| if d.abs() > 1e-15 { 1.0 / d } else { 1.0 })
            .collect();

        let mut x = vec![0.0; n];
        let mut r = b.as_slice().to_vec();
        let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, mi)| ri * mi).collect();
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut ap = vec![0.0; n];

        let b_norm = dot(&r, &r).sqrt();
        if b_norm == 0.0 {
            return Ok(Solution {
                x: DVector::zeros(n),
                iterations: 0,
                residual: 0.0,
            });
        }

        for it in 0..self.max_iterations {
            let rel = dot(&r, &r).sqrt() / b_norm;
            if rel < self.tolerance {
                return Ok(Solution {
                    x: DVector::from_vec(x),
                    iterations: it,
                    residual: rel,
                });
            }

            spmv(a, &p, &mut ap);
            let pap = dot(&p, &ap);
            if pap <= 0.0 {
                return Err(SolveError::NotPositiveDefinite);
            }
            let alpha = rz / pap;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            for i in 0..n {
                z[i] = r[i] * inv_diag[i];
            }
            let rz_new = dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        let rel = dot(&r, &r).sqrt() / b_norm;
        if rel < self.tolerance {
            return Ok(Solution {
                x: DVector::from_vec(x),
                iterations: self.max_iterations,
                residual: rel,
            });
        }
        Err(SolveError::NotConverged {
            iterations: self.max_iterations,
            residual: rel,
        })
    }
}

/// Solver configured by `kind`.
pub fn solver_for(kind: SolverKind) -> Box<dyn SparseSolver> {
    match kind {
        SolverKind::Cholesky => Box::new(CholeskySolver),
        SolverKind::ConjugateGradient {
            max_iterations,
            tolerance,
        } => Box::new(ConjugateGradientSolver {
            max_iterations,
            tolerance,
        }),
    }
}

fn check_dims(a: &CscMatrix<f64>, b: &DVector<f64>) -> Result<(), SolveError> {
    if a.nrows() != a.ncols() || a.nrows() != b.len() {
        return Err(SolveError::Dimension {
            rows: a.nrows(),
            cols: a.ncols(),
            len: b.len(),
        });
    }
    Ok(())
}

/// `y = A x` over the compressed columns.
fn spmv(a: &CscMatrix<f64>, x: &[f64], y: &mut [f64]) {
    y.iter_mut().for_each(|v| *v = 0.0);
    let offsets = a.col_offsets();
    let rows = a.row_indices();
    let values = a.values();
    for col in 0..a.ncols() {
        let xc = x[col];
        for idx in offsets[col]..offsets[col + 1] {
            y[rows[idx]] += values[idx] * xc;
        }
    }
}

fn diagonal(a: &CscMatrix<f64>) -> Vec<f64> {
    let mut diag = vec![0.0; a.nrows().min(a.ncols())];
    let offsets = a.col_offsets();
    let rows = a.row_indices();
    let values = a.values();
    for (col, d) in diag.iter_mut().enumerate() {
        for idx in offsets[col]..offsets[col + 1] {
            if rows[idx] == col {
                *d += values[idx];
            }
        }
    }
    diag
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn relative_residual(a: &CscMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let mut ax = vec![0.0; b.len()];
    spmv(a, x.as_slice(), &mut ax);
    let r: f64 = ax
        .iter()
        .zip(b.iter())
        .map(|(l, r)| (r - l) * (r - l))
        .sum::<f64>()
        .sqrt();
    let b_norm = b.norm();
    if b_norm > 0.0 {
        r / b_norm
    } else {
        r
    }
}
