//! Stacking ensemble method

use crate::error::{ObesityError, Result};
use crate::training::cross_validation::{CVStrategy, CrossValidator};
use crate::training::{
    gather_rows, Classifier, GradientBoostingClassifier, LogisticRegression, MLPClassifier,
};
use ndarray::{concatenate, s, Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Configuration for stacking ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Number of stratified folds used to produce out-of-fold probabilities
    pub n_folds: usize,
    /// Whether to include original features in meta-learner input
    pub passthrough: bool,
    /// Random seed for the fold assignment
    pub seed: u64,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            passthrough: true,
            seed: 42,
        }
    }
}

impl StackingConfig {
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A first-level learner of the stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BaseLearner {
    Mlp(MLPClassifier),
    Logistic(LogisticRegression),
    GradientBoosting(GradientBoostingClassifier),
}

impl BaseLearner {
    fn inner(&self) -> &dyn Classifier {
        match self {
            BaseLearner::Mlp(m) => m,
            BaseLearner::Logistic(m) => m,
            BaseLearner::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            BaseLearner::Mlp(m) => m,
            BaseLearner::Logistic(m) => m,
            BaseLearner::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for BaseLearner {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        self.inner_mut().fit(x, y, n_classes)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

/// Two-level stacked generalisation.
///
/// The meta-learner sees `[oof_proba(learner_1) | ... | oof_proba(learner_m)]`,
/// followed by the original features when passthrough is on. After the
/// out-of-fold pass every base learner is refit on the full input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingClassifier {
    config: StackingConfig,
    base_learners: Vec<BaseLearner>,
    meta_learner: LogisticRegression,
    n_classes: usize,
    n_features: usize,
    is_fitted: bool,
}

impl StackingClassifier {
    /// Create a new stacking classifier from unfitted learners
    pub fn new(config: StackingConfig, base_learners: Vec<BaseLearner>, meta_learner: LogisticRegression) -> Self {
        Self {
            config,
            base_learners,
            meta_learner,
            n_classes: 0,
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    pub fn base_learners(&self) -> &[BaseLearner] {
        &self.base_learners
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Out-of-fold class probabilities, one `n_classes` block per learner
    fn out_of_fold(&self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<Array2<f64>> {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.config.n_folds,
            shuffle: true,
        })
        .with_random_state(self.config.seed);
        let splits = cv.split(x.nrows(), Some(y))?;

        let tasks: Vec<(usize, usize)> = (0..self.base_learners.len())
            .flat_map(|b| (0..splits.len()).map(move |f| (b, f)))
            .collect();

        let fold_probas: Vec<(usize, usize, Array2<f64>)> = tasks
            .par_iter()
            .map(|&(b, f)| -> Result<(usize, usize, Array2<f64>)> {
                let split = &splits[f];
                let mut learner = self.base_learners[b].clone();
                let y_train = y.select(Axis(0), &split.train_indices);
                learner.fit(&gather_rows(x, &split.train_indices), &y_train, n_classes)?;
                let proba = learner.predict_proba(&gather_rows(x, &split.test_indices))?;
                Ok((b, f, proba))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut oof = Array2::zeros((x.nrows(), self.base_learners.len() * n_classes));
        for (b, f, proba) in fold_probas {
            for (local, &row) in splits[f].test_indices.iter().enumerate() {
                oof.slice_mut(s![row, b * n_classes..(b + 1) * n_classes])
                    .assign(&proba.row(local));
            }
        }
        Ok(oof)
    }

    fn meta_features(&self, probas: Array2<f64>, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.config.passthrough {
            Ok(concatenate(Axis(1), &[probas.view(), x.view()])?)
        } else {
            Ok(probas)
        }
    }

    fn base_probas(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let probas = self
            .base_learners
            .par_iter()
            .map(|learner| learner.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = probas.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(1), &views)?)
    }
}

impl Classifier for StackingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        if self.base_learners.is_empty() {
            return Err(ObesityError::ValidationError("No base models provided".to_string()));
        }
        let start = Instant::now();

        let oof = self.out_of_fold(x, y, n_classes)?;
        tracing::debug!(
            n_learners = self.base_learners.len(),
            n_folds = self.config.n_folds,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Out-of-fold probabilities ready"
        );

        let refit: Vec<BaseLearner> = self
            .base_learners
            .par_iter()
            .map(|prototype| -> Result<BaseLearner> {
                let mut learner = prototype.clone();
                learner.fit(x, y, n_classes)?;
                Ok(learner)
            })
            .collect::<Result<Vec<_>>>()?;
        self.base_learners = refit;

        let meta_x = self.meta_features(oof, x)?;
        self.meta_learner.fit(&meta_x, y, n_classes)?;

        self.n_classes = n_classes;
        self.n_features = x.ncols();
        self.is_fitted = true;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            meta_features = meta_x.ncols(),
            "Fitted stacking ensemble"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ObesityError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let meta_x = self.meta_features(self.base_probas(x)?, x)?;
        self.meta_learner.predict_proba(&meta_x)
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn name(&self) -> &'static str {
        "stacking"
    }
}
