//! Training run configuration

use crate::error::{ObesityError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the sweep and the final refit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for every stochastic step of the run
    pub seed: u64,

    /// Fraction of rows held out for the final evaluation
    pub test_size: f64,

    /// Stratified folds used to score each candidate
    pub cv_folds: usize,

    /// Stacking folds while sweeping
    pub sweep_stack_folds: usize,

    /// Stacking folds for the refit of the winner
    pub final_stack_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.15,
            cv_folds: 3,
            sweep_stack_folds: 3,
            final_stack_folds: 5,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_stack_folds(mut self, sweep: usize, final_refit: usize) -> Self {
        self.sweep_stack_folds = sweep;
        self.final_stack_folds = final_refit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ObesityError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        for (name, folds) in [
            ("cv_folds", self.cv_folds),
            ("sweep_stack_folds", self.sweep_stack_folds),
            ("final_stack_folds", self.final_stack_folds),
        ] {
            if folds < 2 {
                return Err(ObesityError::ConfigError(format!("{} must be at least 2, got {}", name, folds)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = TrainingConfig::default();
        assert_eq!(c.seed, 42);
        assert_eq!(c.cv_folds, 3);
        assert_eq!(c.final_stack_folds, 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"seed": 7, "cv_folds": 4}}"#).unwrap();
        let c = TrainingConfig::from_json_file(file.path()).unwrap();
        assert_eq!(c.seed, 7);
        assert_eq!(c.cv_folds, 4);
        assert_eq!(c.test_size, 0.15);
    }

    #[test]
    fn test_invalid() {
        assert!(TrainingConfig::new().with_test_size(1.0).validate().is_err());
        assert!(TrainingConfig::new().with_cv_folds(1).validate().is_err());
    }
}
