//! Diagnostics hooks for the iterative components.
//!
//! Each component reports progress through an [`Observer`] passed by the
//! caller instead of printing. [`LogObserver`] forwards events to the `log`
//! facade and is what the plain entry points use; [`RecordingObserver`] keeps
//! them in memory.

use log::{debug, trace, warn};

/// A single diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// One RANSAC hypothesis was scored.
    RansacTrial {
        trial: usize,
        inliers: usize,
        budget: usize,
    },
    /// The best model was replaced.
    RansacImproved {
        trial: usize,
        inliers: usize,
        fit: f64,
        budget: usize,
    },
    RansacFinished {
        iterations: usize,
        inliers: usize,
    },
    SmoothingStep {
        iteration: usize,
        iterations: usize,
        /// Largest geodesic step taken by any pixel in this iteration.
        max_step: f64,
    },
    RegularizationStep {
        iteration: usize,
        iterations: usize,
        max_step: f64,
        /// Pixels whose fidelity term was dropped as numerically unstable.
        unstable: usize,
    },
    SmoothingFinished {
        energy_before: f64,
        energy_after: f64,
    },
    /// Normals whose `n3` was too small to form a gradient.
    DegenerateNormals {
        count: usize,
        pixels: usize,
    },
    SystemAssembled {
        unknowns: usize,
        nonzeros: usize,
    },
    SolverFinished {
        iterations: usize,
        residual: f64,
    },
    /// A per-pixel robust fit failed and a fallback was used.
    PixelFallback {
        row: usize,
        col: usize,
    },
}

pub trait Observer {
    fn notify(&mut self, event: &Event);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn notify(&mut self, _event: &Event) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&mut self, event: &Event) {
        match *event {
            Event::RansacTrial {
                trial,
                inliers,
                budget,
            } => trace!("ransac trial {trial}/{budget}: {inliers} inliers"),
            Event::RansacImproved {
                trial,
                inliers,
                fit,
                budget,
            } => debug!(
                "ransac trial {trial}: best model now has {inliers} inliers, fit {fit:.3e}, budget {budget}"
            ),
            Event::RansacFinished {
                iterations,
                inliers,
            } => debug!("ransac finished after {iterations} trials with {inliers} inliers"),
            Event::SmoothingStep {
                iteration,
                iterations,
                max_step,
            } => trace!("smoothing iteration {iteration}/{iterations}: max step {max_step:.3e}"),
            Event::RegularizationStep {
                iteration,
                iterations,
                max_step,
                unstable,
            } => trace!(
                "regularization iteration {iteration}/{iterations}: max step {max_step:.3e}, {unstable} unstable"
            ),
            Event::SmoothingFinished {
                energy_before,
                energy_after,
            } => debug!("normal field energy {energy_before:.4e} -> {energy_after:.4e}"),
            Event::DegenerateNormals { count, pixels } => {
                warn!("{count} of {pixels} normals have |n3| ~ 0 and no finite gradient")
            }
            Event::SystemAssembled {
                unknowns,
                nonzeros,
            } => debug!("poisson system: {unknowns} unknowns, {nonzeros} non-zeros"),
            Event::SolverFinished {
                iterations,
                residual,
            } => debug!("sparse solve: {iterations} iterations, residual {residual:.3e}"),
            Event::PixelFallback { row, col } => {
                trace!("pixel ({row}, {col}): robust fit failed, using least squares")
            }
        }
    }
}

/// Keeps every event, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<Event>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for RecordingObserver {
    fn notify(&mut self, event: &Event) {
        self.events.push(*event);
    }
}
