//! Error type shared by every component.

use thiserror::Error;

/// Errors reported by the estimators, integrators and smoothers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("invalid measurements: {0}")]
    InvalidMeasurements(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("no well-conditioned light triple found in {tries} tries (degenerate light configuration)")]
    DegenerateSample { tries: usize },
    #[error("no model gathered a non-empty consensus set in {iterations} iterations")]
    NoAdequateModel { iterations: usize },
    #[error(
        "sparse solve failed on a {rows}x{cols} mask with {pixels} domain pixels \
         spanning {first:?}..={last:?}: {reason}"
    )]
    LinearSolve {
        rows: usize,
        cols: usize,
        pixels: usize,
        /// Top-left `(row, col)` corner of the domain bounding box.
        first: (usize, usize),
        /// Bottom-right `(row, col)` corner of the domain bounding box.
        last: (usize, usize),
        reason: String,
    },
}

impl Error {
    /// `true` for the two RANSAC outcomes that mean "no solution" rather than
    /// misuse: a degenerate light configuration or an empty consensus.
    pub fn is_no_solution(&self) -> bool {
        matches!(
            self,
            Error::DegenerateSample { .. } | Error::NoAdequateModel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_solve_message_names_the_domain() {
        let err = Error::LinearSolve {
            rows: 64,
            cols: 48,
            pixels: 1200,
            first: (3, 4),
            last: (40, 41),
            reason: "not positive definite".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("64x48"));
        assert!(msg.contains("1200"));
        assert!(msg.contains("(3, 4)..=(40, 41)"));
    }

    #[test]
    fn no_solution_classification() {
        assert!(Error::DegenerateSample { tries: 100 }.is_no_solution());
        assert!(Error::NoAdequateModel { iterations: 1 }.is_no_solution());
        assert!(!Error::InvalidParameter("x".into()).is_no_solution());
    }
}
