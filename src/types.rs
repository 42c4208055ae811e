//! Core shared types: dense grids, masks, normal fields and measurement sets.
//!
//! Grids are `nalgebra` dynamic matrices indexed `(row, col)`. Row is the first
//! image axis (the one the `p` gradient component differentiates along), column
//! the second.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::error::{Error, Result};

/// Dynamic matrix of `f64`. Estimators and samplers operate on rows of this
/// type, one datum per row.
pub type DataMatrix = DMatrix<f64>;

/// Scalar field over the image grid.
pub type Grid = DMatrix<f64>;

/// Binary reconstruction domain. `true` marks a pixel inside the domain.
pub type Mask = DMatrix<bool>;

/// Depth map produced by the integrators; `NaN` outside the mask.
pub type DepthMap = DMatrix<f64>;

/// Per-pixel unit normals stored as three co-indexed component grids.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalField {
    pub n1: Grid,
    pub n2: Grid,
    pub n3: Grid,
}

impl NormalField {
    /// Build a field from its components, checking that all three share a shape.
    pub fn new(n1: Grid, n2: Grid, n3: Grid) -> Result<Self> {
        let shape = n1.shape();
        ensure_shape("n2", shape, n2.shape())?;
        ensure_shape("n3", shape, n3.shape())?;
        Ok(Self { n1, n2, n3 })
    }

    /// Field of `rows x cols` copies of `n`.
    pub fn constant(rows: usize, cols: usize, n: Vector3<f64>) -> Self {
        Self {
            n1: Grid::from_element(rows, cols, n.x),
            n2: Grid::from_element(rows, cols, n.y),
            n3: Grid::from_element(rows, cols, n.z),
        }
    }

    /// Build a field by evaluating `f(row, col)` at every pixel.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Vector3<f64>,
    {
        let mut field = Self::constant(rows, cols, Vector3::zeros());
        for r in 0..rows {
            for c in 0..cols {
                field.set(r, c, f(r, c));
            }
        }
        field
    }

    pub fn shape(&self) -> (usize, usize) {
        self.n1.shape()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Vector3<f64> {
        Vector3::new(
            self.n1[(row, col)],
            self.n2[(row, col)],
            self.n3[(row, col)],
        )
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, n: Vector3<f64>) {
        self.n1[(row, col)] = n.x;
        self.n2[(row, col)] = n.y;
        self.n3[(row, col)] = n.z;
    }

    /// Fail fast when the field and `mask` disagree on shape.
    pub fn check_mask(&self, mask: &Mask) -> Result<()> {
        ensure_shape("mask", self.shape(), mask.shape())
    }
}

/// Ordered set of `(I_k, S_k)` pairs: observed intensity and light vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LightMeasurements {
    intensities: DVector<f64>,
    lights: DMatrix<f64>,
}

impl LightMeasurements {
    /// `lights` must be `K x 3` and `intensities` of length `K`.
    pub fn new(intensities: DVector<f64>, lights: DMatrix<f64>) -> Result<Self> {
        if lights.ncols() != 3 {
            return Err(Error::InvalidMeasurements(format!(
                "light matrix must have 3 columns, got {}",
                lights.ncols()
            )));
        }
        if lights.nrows() != intensities.len() {
            return Err(Error::InvalidMeasurements(format!(
                "{} intensities for {} light vectors",
                intensities.len(),
                lights.nrows()
            )));
        }
        Ok(Self {
            intensities,
            lights,
        })
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    pub fn intensities(&self) -> &DVector<f64> {
        &self.intensities
    }

    pub fn lights(&self) -> &DMatrix<f64> {
        &self.lights
    }

    /// Pack into the estimator layout: one row `[I, sx, sy, sz]` per measurement.
    pub fn to_data_matrix(&self) -> DataMatrix {
        let k = self.len();
        DataMatrix::from_fn(k, 4, |r, c| {
            if c == 0 {
                self.intensities[r]
            } else {
                self.lights[(r, c - 1)]
            }
        })
    }
}

pub(crate) fn ensure_shape(
    what: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected != found {
        return Err(Error::ShapeMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
