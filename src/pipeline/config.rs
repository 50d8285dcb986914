//! Candidate and pipeline configuration

use crate::error::{ObesityError, Result};
use crate::preprocessing::PreprocessingConfig;
use crate::synthetic::OversamplingStrategy;
use crate::training::{GradientBoostingConfig, LogisticRegressionConfig, MLPConfig};
use serde::{Deserialize, Serialize};

/// One point of the configuration space: everything needed to build an
/// unfitted pipeline apart from the stacking fold count and the seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Human-readable label used in logs and reports
    pub name: String,
    /// Derive BMI / lifestyle flags before preprocessing
    pub feature_engineering: bool,
    pub preprocessing: PreprocessingConfig,
    /// Mutual-information percentile to keep; `None` disables selection
    pub selector_percentile: Option<f64>,
    pub oversampling: OversamplingStrategy,
    pub mlp: MLPConfig,
    pub logistic: LogisticRegressionConfig,
    pub gradient_boosting: GradientBoostingConfig,
    pub meta: LogisticRegressionConfig,
    /// Append the transformed features to the meta-learner input
    pub passthrough: bool,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            feature_engineering: true,
            preprocessing: PreprocessingConfig::default(),
            selector_percentile: Some(98.0),
            oversampling: OversamplingStrategy::Smote { k_neighbors: 3 },
            mlp: MLPConfig::new().with_hidden_layers(vec![320, 160]).with_alpha(5e-4),
            logistic: LogisticRegressionConfig::new().with_c(2.0).with_max_iter(5000),
            gradient_boosting: GradientBoostingConfig::new()
                .with_n_estimators(1000)
                .with_learning_rate(0.05)
                .with_max_depth(3)
                .with_subsample(0.9),
            meta: LogisticRegressionConfig::new().with_c(3.0).with_max_iter(6000),
            passthrough: true,
        }
    }
}

impl CandidateConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_selector(mut self, percentile: Option<f64>) -> Self {
        self.selector_percentile = percentile;
        self
    }

    pub fn with_oversampling(mut self, strategy: OversamplingStrategy) -> Self {
        self.oversampling = strategy;
        self
    }

    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.mlp = self.mlp.with_hidden_layers(layers);
        self
    }

    pub fn with_mlp(mut self, mlp: MLPConfig) -> Self {
        self.mlp = mlp;
        self
    }

    pub fn with_boosting(mut self, n_estimators: usize, learning_rate: f64) -> Self {
        self.gradient_boosting = self
            .gradient_boosting
            .with_n_estimators(n_estimators)
            .with_learning_rate(learning_rate);
        self
    }

    pub fn with_feature_engineering(mut self, enabled: bool) -> Self {
        self.feature_engineering = enabled;
        self
    }

    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Reject settings no pipeline could be built from
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.selector_percentile {
            if !(p > 0.0 && p <= 100.0) {
                return Err(ObesityError::InvalidParameter {
                    name: "selector_percentile".to_string(),
                    value: p.to_string(),
                    reason: "must be in (0, 100]".to_string(),
                });
            }
        }
        match self.oversampling {
            OversamplingStrategy::Smote { k_neighbors } | OversamplingStrategy::BorderlineSmote { k_neighbors }
                if k_neighbors == 0 =>
            {
                Err(ObesityError::InvalidParameter {
                    name: "k_neighbors".to_string(),
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// A candidate bound to the stacking fold count and run seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub candidate: CandidateConfig,
    /// Folds of the internal out-of-fold pass of the stack
    pub stack_folds: usize,
    pub seed: u64,
}

impl PipelineConfig {
    pub fn new(candidate: CandidateConfig) -> Self {
        Self {
            candidate,
            stack_folds: 5,
            seed: 42,
        }
    }

    pub fn with_stack_folds(mut self, folds: usize) -> Self {
        self.stack_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
