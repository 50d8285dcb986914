//! Preprocessing configuration

use super::{ImputeStrategy, ScalerType};
use serde::{Deserialize, Serialize};

/// Configuration for the column transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Strategy for handling missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Type of scaler to use for numeric features
    pub scaler_type: ScalerType,

    /// Whether to expand numeric features with degree-2 products
    pub polynomial_features: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            numeric_impute_strategy: ImputeStrategy::Median,
            scaler_type: ScalerType::Standard,
            polynomial_features: true,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set numeric impute strategy
    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute_strategy = strategy;
        self
    }

    /// Builder method to set scaler type
    pub fn with_scaler(mut self, scaler_type: ScalerType) -> Self {
        self.scaler_type = scaler_type;
        self
    }

    /// Builder method to toggle polynomial expansion
    pub fn with_polynomial_features(mut self, enabled: bool) -> Self {
        self.polynomial_features = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.numeric_impute_strategy, ImputeStrategy::Median);
        assert!(config.polynomial_features);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PreprocessingConfig::new()
            .with_scaler(ScalerType::MinMax)
            .with_numeric_impute(ImputeStrategy::Mean)
            .with_polynomial_features(false);
        assert_eq!(config.scaler_type, ScalerType::MinMax);
        assert_eq!(config.numeric_impute_strategy, ImputeStrategy::Mean);
        assert!(!config.polynomial_features);
    }

    #[test]
    fn test_partial_json() {
        let config: PreprocessingConfig = serde_json::from_str(r#"{"polynomial_features": false}"#).unwrap();
        assert_eq!(config.scaler_type, ScalerType::Standard);
        assert!(!config.polynomial_features);
    }
}
