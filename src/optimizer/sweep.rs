//! Cross-validated sweep over the configuration space

use super::config::TrainingConfig;
use super::search_space::{ConfigSpace, ExhaustiveSearch, SearchStrategy};
use crate::dataset::{Dataset, LabelEncoder};
use crate::error::{ObesityError, Result};
use crate::pipeline::{CandidateConfig, FittedPipeline, PipelineConfig};
use crate::training::{
    stratified_train_test_split, CVResults, CVStrategy, ClassificationReport, CrossValidator,
};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position of the candidate in the space
    pub index: usize,
    pub name: String,
    /// Fold accuracies; `None` when the candidate failed
    pub cv: Option<CVResults>,
    /// Trial duration in seconds
    pub duration_secs: f64,
    /// Error message of a failed trial
    pub error: Option<String>,
}

impl TrialResult {
    pub fn succeeded(index: usize, name: String, cv: CVResults, duration_secs: f64) -> Self {
        Self {
            index,
            name,
            cv: Some(cv),
            duration_secs,
            error: None,
        }
    }

    pub fn failed(index: usize, name: String, error: String, duration_secs: f64) -> Self {
        Self {
            index,
            name,
            cv: None,
            duration_secs,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.cv.is_none()
    }

    pub fn mean_score(&self) -> Option<f64> {
        self.cv.as_ref().map(|cv| cv.mean_score)
    }

    pub fn std_score(&self) -> Option<f64> {
        self.cv.as_ref().map(|cv| cv.std_score)
    }
}

/// All trials of a sweep plus the winner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub strategy: String,
    pub trials: Vec<TrialResult>,
    /// Index into `trials` of the best successful trial
    pub best_trial_idx: usize,
    pub total_duration_secs: f64,
}

impl SweepReport {
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_trial_idx]
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failed()).count()
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: FittedPipeline,
    pub sweep: SweepReport,
    pub holdout: ClassificationReport,
    pub best_candidate: CandidateConfig,
}

/// Scores candidates by stratified CV, picks the best mean accuracy
/// (earliest candidate on ties) and refits it.
pub struct SweepDriver<S: SearchStrategy = ExhaustiveSearch> {
    config: TrainingConfig,
    space: ConfigSpace,
    strategy: S,
}

impl SweepDriver<ExhaustiveSearch> {
    pub fn new(config: TrainingConfig, space: ConfigSpace) -> Self {
        Self::with_strategy(config, space, ExhaustiveSearch)
    }
}

impl<S: SearchStrategy> SweepDriver<S> {
    pub fn with_strategy(config: TrainingConfig, space: ConfigSpace, strategy: S) -> Self {
        Self { config, space, strategy }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn space(&self) -> &ConfigSpace {
        &self.space
    }

    /// Stratified k-fold accuracy of one candidate on `dataset`; folds run in
    /// parallel and scores come back in fold order
    pub fn evaluate(&self, candidate: &CandidateConfig, dataset: &Dataset) -> Result<CVResults> {
        let encoder = LabelEncoder::fit(dataset.labels())?;
        let y = encoder.encode(dataset.labels())?;
        let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.config.cv_folds,
            shuffle: true,
        })
        .with_random_state(self.config.seed)
        .split(dataset.len(), Some(&y))?;

        let pipeline_config = PipelineConfig::new(candidate.clone())
            .with_stack_folds(self.config.sweep_stack_folds)
            .with_seed(self.config.seed);

        let scores = splits
            .par_iter()
            .map(|split| -> Result<f64> {
                let train = dataset.subset(&split.train_indices);
                let test = dataset.subset(&split.test_indices);
                let fitted = FittedPipeline::fit(&train, &pipeline_config)?;
                let predicted = fitted.predict(test.records())?;
                let correct = predicted.iter().zip(test.labels()).filter(|(p, t)| p == t).count();
                Ok(correct as f64 / test.len().max(1) as f64)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CVResults::from_scores(scores))
    }

    /// Evaluate candidates until the strategy is exhausted. Failing
    /// candidates are logged and recorded; the sweep only errors when
    /// nothing succeeded.
    pub fn sweep(&mut self, dataset: &Dataset) -> Result<SweepReport> {
        self.config.validate()?;
        let start = Instant::now();
        let mut trials: Vec<TrialResult> = Vec::new();
        let mut best: Option<(usize, f64)> = None;

        tracing::info!(
            candidates = self.space.len(),
            strategy = self.strategy.name(),
            folds = self.config.cv_folds,
            "Sweeping configuration space"
        );

        while let Some(index) = self.strategy.next_candidate(&self.space, &trials) {
            let candidate = self.space.get(index).ok_or_else(|| {
                ObesityError::ConfigError(format!("Search strategy proposed unknown candidate {}", index))
            })?;
            let trial_start = Instant::now();

            let trial = match self.evaluate(candidate, dataset) {
                Ok(cv) => {
                    let duration = trial_start.elapsed().as_secs_f64();
                    tracing::info!(
                        trial = trials.len() + 1,
                        candidate = %candidate.name,
                        mean = %format!("{:.4}", cv.mean_score),
                        std = %format!("{:.4}", cv.std_score),
                        secs = %format!("{:.1}", duration),
                        "CV accuracy"
                    );
                    let is_better = best.map_or(true, |(_, b)| cv.mean_score > b);
                    if is_better {
                        best = Some((trials.len(), cv.mean_score));
                    }
                    TrialResult::succeeded(index, candidate.name.clone(), cv, duration)
                }
                Err(e) => {
                    tracing::warn!(candidate = %candidate.name, error = %e, "Candidate failed, skipping");
                    TrialResult::failed(index, candidate.name.clone(), e.to_string(), trial_start.elapsed().as_secs_f64())
                }
            };
            trials.push(trial);
        }

        let (best_trial_idx, best_mean) = best.ok_or_else(|| {
            ObesityError::TrainingError(format!("All {} candidates failed", trials.len()))
        })?;
        let report = SweepReport {
            strategy: self.strategy.name().to_string(),
            trials,
            best_trial_idx,
            total_duration_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            best = %report.best_trial().name,
            mean = %format!("{:.4}", best_mean),
            failed = report.n_failed(),
            "Sweep finished"
        );
        Ok(report)
    }

    /// Hold out a stratified test split, sweep on the rest, refit the
    /// winner with the final stacking fold count and score it once on the
    /// held-out rows
    pub fn run(&mut self, dataset: &Dataset) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let encoder = LabelEncoder::fit(dataset.labels())?;
        let y = encoder.encode(dataset.labels())?;
        let (train_idx, test_idx) = stratified_train_test_split(&y, self.config.test_size, self.config.seed)?;
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);
        tracing::info!(train = train.len(), test = test.len(), "Split data");

        let sweep = self.sweep(&train)?;
        let best_index = sweep.best_trial().index;
        let best_candidate = self
            .space
            .get(best_index)
            .cloned()
            .ok_or_else(|| ObesityError::ConfigError(format!("Unknown candidate {}", best_index)))?;

        let start = Instant::now();
        let pipeline_config = PipelineConfig::new(best_candidate.clone())
            .with_stack_folds(self.config.final_stack_folds)
            .with_seed(self.config.seed);
        let pipeline = FittedPipeline::fit(&train, &pipeline_config)?;
        tracing::info!(secs = %format!("{:.1}", start.elapsed().as_secs_f64()), "Fitted best candidate");

        let predicted = pipeline.predict(test.records())?;
        let y_true = encoder.encode(test.labels())?;
        let y_pred: Array1<usize> = encoder.encode(&predicted)?;
        let holdout = ClassificationReport::compute(&y_true, &y_pred, encoder.classes())?;
        tracing::info!(accuracy = %format!("{:.4}", holdout.accuracy), "Hold-out evaluation");

        Ok(TrainingOutcome {
            pipeline,
            sweep,
            holdout,
            best_candidate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generate_sample_dataset;
    use crate::pipeline::test_support::fast_candidate;

    fn small_space() -> ConfigSpace {
        ConfigSpace::new(vec![
            fast_candidate("a"),
            fast_candidate("b").with_selector(None),
        ])
        .unwrap()
    }

    #[test]
    fn test_sweep_is_deterministic() {
        let ds = generate_sample_dataset(140, 11).unwrap();
        let mut first = SweepDriver::new(TrainingConfig::default(), small_space());
        let mut second = SweepDriver::new(TrainingConfig::default(), small_space());
        let a = first.sweep(&ds).unwrap();
        let b = second.sweep(&ds).unwrap();
        assert_eq!(a.trials.len(), 2);
        for (x, y) in a.trials.iter().zip(&b.trials) {
            assert_eq!(x.mean_score(), y.mean_score());
        }
        assert_eq!(a.best_trial_idx, b.best_trial_idx);
    }

    #[test]
    fn test_failed_candidate_is_skipped() {
        let ds = generate_sample_dataset(140, 11).unwrap();
        let mut broken = fast_candidate("broken");
        broken.gradient_boosting.subsample = 0.0;
        let space = ConfigSpace::new(vec![broken, fast_candidate("ok")]).unwrap();

        let report = SweepDriver::new(TrainingConfig::default(), space).sweep(&ds).unwrap();
        assert!(report.trials[0].is_failed());
        assert!(report.trials[0].error.is_some());
        assert_eq!(report.best_trial().name, "ok");
        assert_eq!(report.n_failed(), 1);
    }

    #[test]
    fn test_all_failed_is_error() {
        let ds = generate_sample_dataset(140, 11).unwrap();
        let mut broken = fast_candidate("broken");
        broken.gradient_boosting.subsample = 0.0;
        let space = ConfigSpace::new(vec![broken]).unwrap();
        assert!(SweepDriver::new(TrainingConfig::default(), space).sweep(&ds).is_err());
    }

    #[test]
    fn test_ties_keep_earliest() {
        let ds = generate_sample_dataset(140, 11).unwrap();
        let space = ConfigSpace::new(vec![fast_candidate("first"), fast_candidate("second")]).unwrap();
        let report = SweepDriver::new(TrainingConfig::default(), space).sweep(&ds).unwrap();
        assert_eq!(report.trials[0].mean_score(), report.trials[1].mean_score());
        assert_eq!(report.best_trial().name, "first");
    }

    #[test]
    fn test_run_produces_holdout_report() {
        let ds = generate_sample_dataset(160, 5).unwrap();
        let space = ConfigSpace::new(vec![fast_candidate("only")]).unwrap();
        let outcome = SweepDriver::new(TrainingConfig::default(), space).run(&ds).unwrap();
        assert_eq!(outcome.best_candidate.name, "only");
        assert_eq!(outcome.pipeline.config().stack_folds, 5);
        let expected_test = (ds.len() as f64 * 0.15).ceil() as usize;
        assert_eq!(outcome.holdout.n_samples, expected_test);
        assert!((0.0..=1.0).contains(&outcome.holdout.accuracy));
    }
}
