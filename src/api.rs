//! High-level entry points for robust light-vector estimation.

use rand::rngs::StdRng;
use rand::RngCore;

use crate::core::{LeastSquaresOptimizer, Ransac, RansacTerminationCriterion};
use crate::error::{Error, Result};
use crate::estimators::LightVectorEstimator;
use crate::models::ScaledNormal;
use crate::observer::{LogObserver, Observer};
use crate::samplers::UniformRandomSampler;
use crate::scoring::{InlierCountScoring, Score};
use crate::settings::RansacSettings;
use crate::types::LightMeasurements;

/// Result of a RANSAC estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult<M> {
    /// The estimated model, refit over its consensus set.
    pub model: M,
    /// Indices of inlier measurements, ascending.
    pub inliers: Vec<usize>,
    /// Inlier count and mean residual of the refit model.
    pub score: Score,
    /// Number of trials performed.
    pub iterations: usize,
}

/// Robustly fit `m` in `I_k = S_k . m`.
///
/// # Arguments
/// * `measurements` - intensity/light pairs
/// * `threshold` - inlier bound on `|I_k - S_k . m|`
/// * `settings` - optional RANSAC settings (defaults if `None`)
/// * `seed` - seed of the sampling stream
///
/// # Errors
/// [`Error::DegenerateSample`] when no trial could draw a well-conditioned
/// light triple, [`Error::NoAdequateModel`] when no hypothesis gathered any
/// inlier.
pub fn estimate_light_vector(
    measurements: &LightMeasurements,
    threshold: f64,
    settings: Option<RansacSettings>,
    seed: u64,
) -> Result<EstimationResult<ScaledNormal>> {
    estimate_light_vector_observed(measurements, threshold, settings, seed, &mut LogObserver)
}

/// [`estimate_light_vector`] reporting progress to `observer`.
pub fn estimate_light_vector_observed(
    measurements: &LightMeasurements,
    threshold: f64,
    settings: Option<RansacSettings>,
    seed: u64,
    observer: &mut dyn Observer,
) -> Result<EstimationResult<ScaledNormal>> {
    let sampler = UniformRandomSampler::from_seed(seed);
    run(measurements, threshold, settings.unwrap_or_default(), sampler, observer)
}

/// [`estimate_light_vector`] drawing from a caller-owned stream, so many
/// calls can share one seeded generator.
pub fn estimate_light_vector_with_rng(
    measurements: &LightMeasurements,
    threshold: f64,
    settings: &RansacSettings,
    rng: &mut StdRng,
    observer: &mut dyn Observer,
) -> Result<EstimationResult<ScaledNormal>> {
    let sampler = UniformRandomSampler::from_rng(rng);
    run(measurements, threshold, *settings, sampler, observer)
}

fn run<R: RngCore>(
    measurements: &LightMeasurements,
    threshold: f64,
    settings: RansacSettings,
    sampler: UniformRandomSampler<R>,
    observer: &mut dyn Observer,
) -> Result<EstimationResult<ScaledNormal>> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "inlier threshold must be non-negative, got {threshold}"
        )));
    }
    if !(0.0..1.0).contains(&settings.confidence) {
        return Err(Error::InvalidParameter(format!(
            "confidence must lie in [0, 1), got {}",
            settings.confidence
        )));
    }
    if measurements.len() < 3 {
        return Err(Error::InvalidMeasurements(format!(
            "at least 3 measurements are needed, got {}",
            measurements.len()
        )));
    }

    let data = measurements.to_data_matrix();
    let det_threshold = settings.det_threshold;

    let mut ransac = Ransac::new(
        settings,
        LightVectorEstimator::new(det_threshold),
        sampler,
        InlierCountScoring::new(threshold, LightVectorEstimator::new(det_threshold)),
        Some(LeastSquaresOptimizer::new(LightVectorEstimator::new(
            det_threshold,
        ))),
        RansacTerminationCriterion {
            confidence: settings.confidence,
        },
    );

    ransac.run(&data, observer)?;

    match (ransac.best_model.take(), ransac.best_score) {
        (Some(model), Some(score)) => Ok(EstimationResult {
            model,
            inliers: std::mem::take(&mut ransac.best_inliers),
            score,
            iterations: ransac.iteration,
        }),
        _ => Err(Error::NoAdequateModel {
            iterations: ransac.iteration,
        }),
    }
}
