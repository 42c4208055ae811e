//! Inlier-count scoring.
//!
//! A hypothesis is better than another only when it gathers strictly more
//! inliers; the mean residual travels along with the count but never decides
//! the comparison.

use std::cmp::Ordering;

use crate::core::{Estimator, Scoring};
use crate::types::DataMatrix;

/// Consensus size plus the mean absolute residual over that consensus.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub inlier_count: usize,
    pub fit: f64,
}

impl Score {
    pub fn new(inlier_count: usize, fit: f64) -> Self {
        Self { inlier_count, fit }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.inlier_count == other.inlier_count
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.inlier_count.cmp(&other.inlier_count))
    }
}

/// Counts data whose estimator residual is at most `threshold`.
pub struct InlierCountScoring<E> {
    threshold: f64,
    estimator: E,
}

impl<E: Estimator> InlierCountScoring<E> {
    pub fn new(threshold: f64, estimator: E) -> Self {
        Self {
            threshold,
            estimator,
        }
    }
}

impl<E: Estimator> Scoring<E::Model> for InlierCountScoring<E> {
    type Score = Score;

    fn score(&self, data: &DataMatrix, model: &E::Model, inliers_out: &mut Vec<usize>) -> Score {
        inliers_out.clear();

        let mut total = 0.0;
        for i in 0..data.nrows() {
            let r = self.estimator.residual(data, model, i);
            if r <= self.threshold {
                inliers_out.push(i);
                total += r;
            }
        }

        let fit = if inliers_out.is_empty() {
            f64::INFINITY
        } else {
            total / inliers_out.len() as f64
        };
        Score::new(inliers_out.len(), fit)
    }

    fn inlier_count(&self, score: &Score) -> usize {
        score.inlier_count
    }

    fn fit(&self, score: &Score) -> f64 {
        score.fit
    }
}
