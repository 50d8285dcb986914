//! Fit / predict unit that is cross-validated, refit and serialized

use super::config::PipelineConfig;
use crate::dataset::{Dataset, LabelEncoder, RawRecord};
use crate::ensemble::{BaseLearner, StackingClassifier, StackingConfig};
use crate::error::{ObesityError, Result};
use crate::feature_engineering::FeatureEngineer;
use crate::preprocessing::{DataPreprocessor, FeatureSelector};
use crate::training::{
    argmax_rows, Classifier, GradientBoostingClassifier, LogisticRegression, MLPClassifier,
};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Summary of what happened during `fit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub n_samples: usize,
    pub n_features_transformed: usize,
    pub n_features_selected: usize,
    pub oversampler: String,
    /// Synthetic rows added per class label
    pub n_synthetic: BTreeMap<String, usize>,
    pub fit_secs: f64,
}

/// A fully fitted pipeline.
///
/// Raw records go in, labels come out: feature engineering, the column
/// transformer, the optional selector and the stack are all applied here.
/// Oversampling only ever runs inside [`FittedPipeline::fit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    config: PipelineConfig,
    engineer: FeatureEngineer,
    preprocessor: DataPreprocessor,
    selector: Option<FeatureSelector>,
    model: StackingClassifier,
    labels: LabelEncoder,
    summary: FitSummary,
}

impl FittedPipeline {
    /// Fit every step on `dataset`
    pub fn fit(dataset: &Dataset, config: &PipelineConfig) -> Result<Self> {
        let start = Instant::now();
        let candidate = &config.candidate;
        candidate.validate()?;
        if dataset.is_empty() {
            return Err(ObesityError::DataError("Cannot fit a pipeline on an empty dataset".to_string()));
        }

        let labels = LabelEncoder::fit(dataset.labels())?;
        let y = labels.encode(dataset.labels())?;

        let engineer = if candidate.feature_engineering {
            FeatureEngineer::new()
        } else {
            FeatureEngineer::disabled()
        };
        let engineered = engineer.transform_dataset(dataset);

        let mut preprocessor = DataPreprocessor::with_config(candidate.preprocessing.clone());
        let transformed = preprocessor.fit_transform(&engineered)?;
        let n_features_transformed = transformed.ncols();

        let (x, selector) = match candidate.selector_percentile {
            Some(p) => {
                let mut selector = FeatureSelector::percentile(p);
                let x = selector.fit_transform(transformed.view(), &y)?;
                (x, Some(selector))
            }
            None => (transformed, None),
        };

        let mut oversampler = candidate.oversampling.resolve(config.seed);
        let resampled = oversampler.fit_resample(&x, &y)?;
        let mut n_synthetic = BTreeMap::new();
        for (&class, &count) in &resampled.n_synthetic {
            n_synthetic.insert(labels.decode(class)?.to_string(), count);
        }
        tracing::debug!(
            sampler = oversampler.name(),
            rows_before = x.nrows(),
            rows_after = resampled.x.nrows(),
            "Resampled training fold"
        );

        let mut model = build_stack(config);
        model.fit(&resampled.x, &resampled.y, labels.n_classes())?;

        let summary = FitSummary {
            n_samples: dataset.len(),
            n_features_transformed,
            n_features_selected: x.ncols(),
            oversampler: oversampler.name().to_string(),
            n_synthetic,
            fit_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            candidate = %candidate.name,
            samples = summary.n_samples,
            features = summary.n_features_selected,
            synthetic = resampled.total_synthetic(),
            secs = %format!("{:.1}", summary.fit_secs),
            "Pipeline fitted"
        );

        Ok(Self {
            config: config.clone(),
            engineer,
            preprocessor,
            selector,
            model,
            labels,
            summary,
        })
    }

    /// Run the fitted feature steps on raw records
    pub fn transform(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        let engineered: Vec<RawRecord> = records.iter().map(|r| self.engineer.transform_record(r)).collect();
        let x = self.preprocessor.transform(&engineered)?;
        match &self.selector {
            Some(selector) => selector.transform(x.view()),
            None => Ok(x),
        }
    }

    /// Class probabilities, columns in [`FittedPipeline::classes`] order
    pub fn predict_proba(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        if records.is_empty() {
            return Ok(Array2::zeros((0, self.labels.n_classes())));
        }
        let x = self.transform(records)?;
        self.model.predict_proba(&x)
    }

    pub fn predict(&self, records: &[RawRecord]) -> Result<Vec<String>> {
        let proba = self.predict_proba(records)?;
        argmax_rows(proba.view())
            .iter()
            .map(|&idx| self.labels.decode(idx).map(str::to_string))
            .collect()
    }

    /// Label and max class probability for one record
    pub fn predict_one(&self, record: &RawRecord) -> Result<(String, f64)> {
        let proba = self.predict_proba(std::slice::from_ref(record))?;
        let (best, confidence) = max_probability(proba.row(0))?;
        Ok((self.labels.decode(best)?.to_string(), confidence))
    }

    pub fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }

    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    /// Names of the columns the stack is trained on
    pub fn feature_names(&self) -> Vec<String> {
        let names = self.preprocessor.feature_names();
        self.selector
            .as_ref()
            .and_then(|s| s.selected_names(names))
            .unwrap_or_else(|| names.to_vec())
    }
}

/// Unfitted stack for a candidate; every stochastic part shares the run seed
fn build_stack(config: &PipelineConfig) -> StackingClassifier {
    let candidate = &config.candidate;
    let mut mlp = candidate.mlp.clone();
    mlp.random_state = config.seed;
    let mut gb = candidate.gradient_boosting.clone();
    gb.random_state = config.seed;

    StackingClassifier::new(
        StackingConfig::default()
            .with_n_folds(config.stack_folds)
            .with_passthrough(candidate.passthrough)
            .with_seed(config.seed),
        vec![
            BaseLearner::Mlp(MLPClassifier::new(mlp)),
            BaseLearner::Logistic(LogisticRegression::new(candidate.logistic.clone())),
            BaseLearner::GradientBoosting(GradientBoostingClassifier::new(gb)),
        ],
        LogisticRegression::new(candidate.meta.clone()),
    )
}

/// Index and value of the largest finite probability; NaN entries are skipped
pub(crate) fn max_probability(row: ArrayView1<f64>) -> Result<(usize, f64)> {
    row.iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
            Some((_, bp)) if p <= bp => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| ObesityError::InferenceError("Model returned no finite class probability".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_max_probability_picks_first_maximum() {
        let row = array![0.2, 0.4, 0.4];
        assert_eq!(max_probability(row.view()).unwrap(), (1, 0.4));
    }

    #[test]
    fn test_max_probability_skips_nan() {
        let row = array![f64::NAN, 0.3, 0.7];
        assert_eq!(max_probability(row.view()).unwrap(), (2, 0.7));
    }

    #[test]
    fn test_max_probability_all_nan_is_error() {
        let row = array![f64::NAN, f64::NAN, f64::NAN];
        assert!(matches!(
            max_probability(row.view()),
            Err(ObesityError::InferenceError(_))
        ));
    }
}
