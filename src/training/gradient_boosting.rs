//! Gradient Boosting implementation
//!
//! Multiclass gradient boosted trees on the softmax deviance: each round
//! fits one histogram regression tree per class to the gradient of the
//! cross-entropy, with Newton leaf values.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::decision_tree::{FeatureBinner, RegressionTree, TreeParams};
use crate::error::{ObesityError, Result};
use crate::training::models::{check_fit_input, check_predict_input, softmax_inplace, Classifier};

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each round
    pub subsample: f64,
    /// L2 regularization on leaf values
    pub reg_lambda: f64,
    /// Histogram bins per feature
    pub max_bins: usize,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            learning_rate: 0.05,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 0.9,
            reg_lambda: 1.0,
            max_bins: 255,
            random_state: 42,
        }
    }
}

impl GradientBoostingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ObesityError::InvalidParameter {
                name: "subsample".to_string(),
                value: self.subsample.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if self.learning_rate <= 0.0 {
            return Err(ObesityError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    /// `trees[round][class]`, leaf values already shrunk
    trees: Vec<Vec<RegressionTree>>,
    /// Log class priors
    init_scores: Option<Array1<f64>>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            init_scores: None,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    fn raw_scores(&self, x: &Array2<f64>, init: &Array1<f64>) -> Array2<f64> {
        let mut scores = Array2::from_shape_fn((x.nrows(), init.len()), |(_, k)| init[k]);
        for round in &self.trees {
            for (k, tree) in round.iter().enumerate() {
                let update = tree.predict(x);
                scores.column_mut(k).zip_mut_with(&update, |s, u| *s += u);
            }
        }
        scores
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        check_fit_input(x, y, n_classes)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let binner = FeatureBinner::fit(x.view(), self.config.max_bins)?;
        let binned = binner.transform(x.view());

        let mut counts = vec![0usize; n_classes];
        for &c in y.iter() {
            counts[c] += 1;
        }
        let init = Array1::from_iter(
            counts
                .iter()
                .map(|&c| ((c as f64).max(1e-3) / n_samples as f64).ln()),
        );

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
            reg_lambda: self.config.reg_lambda,
            ..TreeParams::default()
        };
        // Friedman's multiclass step factor combined with shrinkage
        let leaf_scale = self.config.learning_rate * (n_classes as f64 - 1.0) / n_classes as f64;
        let n_sub = ((n_samples as f64 * self.config.subsample).floor() as usize).clamp(1, n_samples);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut scores = Array2::from_shape_fn((n_samples, n_classes), |(_, k)| init[k]);
        self.trees = Vec::with_capacity(self.config.n_estimators);

        for _round in 0..self.config.n_estimators {
            let rows: Vec<usize> = if n_sub < n_samples {
                let mut r = rand::seq::index::sample(&mut rng, n_samples, n_sub).into_vec();
                r.sort_unstable();
                r
            } else {
                (0..n_samples).collect()
            };

            let mut proba = scores.clone();
            softmax_inplace(&mut proba);

            let round: Vec<RegressionTree> = (0..n_classes)
                .into_par_iter()
                .map(|k| -> Result<RegressionTree> {
                    let p = proba.column(k);
                    let grad: Vec<f64> = p
                        .iter()
                        .zip(y.iter())
                        .map(|(&pk, &yi)| pk - if yi == k { 1.0 } else { 0.0 })
                        .collect();
                    let hess: Vec<f64> = p.iter().map(|&pk| (pk * (1.0 - pk)).max(1e-16)).collect();
                    let mut tree = RegressionTree::fit_newton(&binned, &binner, &grad, &hess, &rows, &params)?;
                    tree.scale_leaves(leaf_scale);
                    Ok(tree)
                })
                .collect::<Result<Vec<_>>>()?;

            for (k, tree) in round.iter().enumerate() {
                let update = tree.predict(x);
                scores.column_mut(k).zip_mut_with(&update, |s, u| *s += u);
            }
            self.trees.push(round);
        }

        tracing::debug!(
            rounds = self.trees.len(),
            n_classes,
            n_samples,
            "Fitted gradient boosting"
        );
        self.init_scores = Some(init);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let init = self.init_scores.as_ref().ok_or(ObesityError::ModelNotFitted)?;
        check_predict_input(x, self.n_features)?;
        let mut scores = self.raw_scores(x, init);
        softmax_inplace(&mut scores);
        Ok(scores)
    }

    fn is_fitted(&self) -> bool {
        self.init_scores.is_some()
    }

    fn name(&self) -> &'static str {
        "gradient_boosting"
    }
}
