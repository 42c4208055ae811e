//! Estimator for the scaled normal of the Lambertian model `I = S . m`.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::core::Estimator;
use crate::models::ScaledNormal;
use crate::types::DataMatrix;
use crate::utils::{least_squares, solve3};

/// Fits `m` from rows `[I, sx, sy, sz]`.
///
/// A minimal sample is three measurements whose light vectors span space
/// well enough: the 3x3 light matrix must satisfy `|det| >= det_threshold`.
pub struct LightVectorEstimator {
    pub det_threshold: f64,
}

impl Default for LightVectorEstimator {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl LightVectorEstimator {
    pub fn new(det_threshold: f64) -> Self {
        Self { det_threshold }
    }

    #[inline]
    fn light(data: &DataMatrix, row: usize) -> Vector3<f64> {
        Vector3::new(data[(row, 1)], data[(row, 2)], data[(row, 3)])
    }

    fn light_matrix(data: &DataMatrix, sample: &[usize]) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| data[(sample[r], c + 1)])
    }
}

impl Estimator for LightVectorEstimator {
    type Model = ScaledNormal;

    fn sample_size(&self) -> usize {
        3
    }

    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        if sample.len() != self.sample_size() || data.ncols() < 4 {
            return false;
        }
        if sample.iter().any(|&i| i >= data.nrows()) {
            return false;
        }
        if sample[0] == sample[1] || sample[0] == sample[2] || sample[1] == sample[2] {
            return false;
        }
        Self::light_matrix(data, sample).determinant().abs() >= self.det_threshold
    }

    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model> {
        if sample.len() != self.sample_size() {
            return self.estimate_model_nonminimal(data, sample);
        }

        let s = Self::light_matrix(data, sample);
        let i = Vector3::new(data[(sample[0], 0)], data[(sample[1], 0)], data[(sample[2], 0)]);
        match solve3(&s, &i) {
            Some(m) => vec![ScaledNormal::new(m)],
            None => Vec::new(),
        }
    }

    fn estimate_model_nonminimal(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model> {
        if sample.len() < self.sample_size() {
            return Vec::new();
        }

        let s = DMatrix::from_fn(sample.len(), 3, |r, c| data[(sample[r], c + 1)]);
        let i = DVector::from_iterator(sample.len(), sample.iter().map(|&k| data[(k, 0)]));
        match least_squares(s, &i) {
            Some(m) => vec![ScaledNormal::new(Vector3::new(m[0], m[1], m[2]))],
            None => Vec::new(),
        }
    }

    fn residual(&self, data: &DataMatrix, model: &ScaledNormal, row: usize) -> f64 {
        (data[(row, 0)] - model.predict(&Self::light(data, row))).abs()
    }
}
