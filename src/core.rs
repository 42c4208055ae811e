//! Core RANSAC traits and pipeline.
//!
//! The pipeline is assembled from interchangeable parts:
//! - an [`Estimator`] producing hypotheses from minimal samples and refits
//!   from larger ones,
//! - a [`Sampler`] drawing minimal samples,
//! - a [`Scoring`] strategy computing consensus sets,
//! - a [`LocalOptimizer`] refining every new best hypothesis,
//! - a [`TerminationCriterion`] shrinking the trial budget.

use crate::error::{Error, Result};
use crate::observer::{Event, Observer};
use crate::settings::RansacSettings;
use crate::types::DataMatrix;

/// Estimator responsible for generating model hypotheses from samples.
pub trait Estimator {
    /// Model type produced by this estimator.
    type Model: Clone;

    /// Size of a minimal sample for this estimator.
    fn sample_size(&self) -> usize;

    /// Check whether a given sample is well conditioned.
    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool;

    /// Estimate candidate models from a minimal sample.
    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model>;

    /// Fit a model to a sample larger than the minimal one.
    fn estimate_model_nonminimal(&self, data: &DataMatrix, sample: &[usize])
        -> Vec<Self::Model>;

    /// Non-negative residual of one datum under `model`.
    fn residual(&self, data: &DataMatrix, model: &Self::Model, row: usize) -> f64;
}

/// Sampler responsible for drawing minimal samples from the data.
pub trait Sampler {
    /// Draw a sample of `sample_size` elements into `out_indices`.
    ///
    /// Returns `false` if a sample could not be drawn at all.
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool;
}

/// Scoring strategy used to evaluate model quality and determine inliers.
pub trait Scoring<M> {
    /// Score type; `>` means "strictly better than".
    type Score: Clone + PartialOrd;

    /// Score a model and write its inlier set into `inliers_out`.
    fn score(&self, data: &DataMatrix, model: &M, inliers_out: &mut Vec<usize>) -> Self::Score;

    /// Number of inliers a score stands for.
    fn inlier_count(&self, score: &Self::Score) -> usize;

    /// Mean residual a score stands for, `NaN` when the score has none.
    fn fit(&self, _score: &Self::Score) -> f64 {
        f64::NAN
    }
}

/// Local optimization strategy, refining a model using its inliers.
pub trait LocalOptimizer<M, S: Clone> {
    /// Returns `(refined_model, refined_score, refined_inliers)`.
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &M,
        best_score: &S,
    ) -> (M, S, Vec<usize>);
}

/// Least-squares local optimizer: refits the model on the whole consensus set
/// and re-evaluates the fit on that same set.
///
/// The inlier set itself is kept as found by the minimal hypothesis.
pub struct LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    estimator: E,
}

impl<E> LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E> LocalOptimizer<E::Model, crate::scoring::Score> for LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &E::Model,
        best_score: &crate::scoring::Score,
    ) -> (E::Model, crate::scoring::Score, Vec<usize>) {
        if inliers.is_empty() {
            return (model.clone(), best_score.clone(), inliers.to_vec());
        }

        let refined = match self
            .estimator
            .estimate_model_nonminimal(data, inliers)
            .into_iter()
            .next()
        {
            Some(refined) => refined,
            None => return (model.clone(), best_score.clone(), inliers.to_vec()),
        };

        let total: f64 = inliers
            .iter()
            .map(|&i| self.estimator.residual(data, &refined, i))
            .sum();
        let score = crate::scoring::Score::new(inliers.len(), total / inliers.len() as f64);
        (refined, score, inliers.to_vec())
    }
}

/// Termination criterion deciding how many trials the loop still needs.
pub trait TerminationCriterion<S> {
    /// Update the trial budget from the current best score.
    ///
    /// Returns `true` if the algorithm should terminate immediately.
    fn check(
        &mut self,
        data: &DataMatrix,
        best_score: &S,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// Standard RANSAC stopping rule.
///
/// With `w` the best inlier ratio and `s` the sample size, the number of
/// trials needed to draw one all-inlier sample with probability `confidence`
/// is `log(1 - confidence) / log(1 - w^s)`. The argument of the second
/// logarithm is clamped into `[eps, 1 - eps]` so the count stays finite. The
/// budget is only ever lowered.
///
/// The estimate uses the inlier ratio of the best hypothesis seen so far, so
/// an early lucky hypothesis can stop the search before the true best model
/// is reached. This is the usual RANSAC trade-off, tuned through
/// `confidence`.
pub struct RansacTerminationCriterion {
    /// Desired confidence in \[0, 1\).
    pub confidence: f64,
}

impl RansacTerminationCriterion {
    /// Trials required for the given inlier ratio.
    pub fn required_iterations(&self, inlier_ratio: f64, sample_size: usize) -> f64 {
        let eps = f64::EPSILON;
        let p_outliers = (1.0 - inlier_ratio.powi(sample_size as i32)).clamp(eps, 1.0 - eps);
        ((1.0 - self.confidence).ln() / p_outliers.ln()).max(0.0)
    }
}

impl TerminationCriterion<crate::scoring::Score> for RansacTerminationCriterion {
    fn check(
        &mut self,
        data: &DataMatrix,
        best_score: &crate::scoring::Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        let n = data.nrows();
        if n == 0 {
            return false;
        }

        let inlier_ratio = (best_score.inlier_count as f64 / n as f64).clamp(0.0, 1.0);
        let required = self.required_iterations(inlier_ratio, sample_size);
        if !required.is_finite() {
            return false;
        }

        let required = required.ceil() as usize;
        if required < *max_iterations {
            *max_iterations = required;
        }

        // The outer loop stops once the (possibly lowered) budget is spent.
        false
    }
}

/// Generic RANSAC pipeline orchestrating the above components.
pub struct Ransac<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc::Score>,
    T: TerminationCriterion<Sc::Score>,
{
    pub settings: RansacSettings,
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub local_optimizer: Option<LO>,
    pub termination: T,

    // Outputs / diagnostics
    pub best_model: Option<E::Model>,
    pub best_inliers: Vec<usize>,
    pub best_score: Option<Sc::Score>,
    pub iteration: usize,
}

impl<E, Sa, Sc, LO, T> Ransac<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc::Score>,
    T: TerminationCriterion<Sc::Score>,
{
    /// Create a new pipeline from its components.
    pub fn new(
        settings: RansacSettings,
        estimator: E,
        sampler: Sa,
        scoring: Sc,
        local_optimizer: Option<LO>,
        termination: T,
    ) -> Self {
        Self {
            settings,
            estimator,
            sampler,
            scoring,
            local_optimizer,
            termination,
            best_model: None,
            best_inliers: Vec::new(),
            best_score: None,
            iteration: 0,
        }
    }

    /// Run the RANSAC loop on the given data matrix.
    ///
    /// Fails with [`Error::DegenerateSample`] as soon as one trial cannot draw
    /// a valid sample within `settings.max_data_tries` attempts. Running out
    /// of budget without any model leaves `best_model` empty; that is not an
    /// error at this level.
    pub fn run(&mut self, data: &DataMatrix, observer: &mut dyn Observer) -> Result<()> {
        let sample_size = self.estimator.sample_size();
        let mut sample = vec![0usize; sample_size];
        let mut tmp_inliers = Vec::new();

        let mut max_iterations = self.settings.max_iterations;

        self.best_inliers.clear();
        self.best_model = None;
        self.best_score = None;
        self.iteration = 0;

        while self.iteration < max_iterations {
            let mut have_sample = false;
            for _ in 0..self.settings.max_data_tries {
                if self.sampler.sample(data, sample_size, &mut sample[..])
                    && self.estimator.is_valid_sample(data, &sample)
                {
                    have_sample = true;
                    break;
                }
            }
            if !have_sample {
                return Err(Error::DegenerateSample {
                    tries: self.settings.max_data_tries,
                });
            }

            let models = self.estimator.estimate_model(data, &sample);
            let mut iteration_improved_best = false;

            for model in models.iter() {
                let score = self.scoring.score(data, model, &mut tmp_inliers);
                let inliers = self.scoring.inlier_count(&score);

                observer.notify(&Event::RansacTrial {
                    trial: self.iteration,
                    inliers,
                    budget: max_iterations,
                });

                let better = match &self.best_score {
                    None => inliers > 0,
                    Some(best) => score > *best,
                };

                if better {
                    self.best_score = Some(score);
                    self.best_model = Some(model.clone());
                    self.best_inliers.clear();
                    self.best_inliers.extend_from_slice(&tmp_inliers);
                    iteration_improved_best = true;
                }
            }

            if iteration_improved_best {
                if let (Some(lo), Some(best_model), Some(best_score)) = (
                    &mut self.local_optimizer,
                    &self.best_model,
                    &self.best_score,
                ) {
                    let (refined_model, refined_score, refined_inliers) =
                        lo.run(data, &self.best_inliers, best_model, best_score);
                    self.best_model = Some(refined_model);
                    self.best_score = Some(refined_score);
                    self.best_inliers = refined_inliers;
                }

                if let Some(best_score) = &self.best_score {
                    let should_terminate =
                        self.termination
                            .check(data, best_score, sample_size, &mut max_iterations);
                    observer.notify(&Event::RansacImproved {
                        trial: self.iteration,
                        inliers: self.best_inliers.len(),
                        fit: self.scoring.fit(best_score),
                        budget: max_iterations,
                    });
                    if should_terminate {
                        self.iteration += 1;
                        break;
                    }
                }
            }

            self.iteration += 1;
        }

        observer.notify(&Event::RansacFinished {
            iterations: self.iteration,
            inliers: self.best_inliers.len(),
        });
        Ok(())
    }
}
