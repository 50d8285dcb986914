//! Data preprocessing module
//!
//! Provides the column transformer used by every fitted pipeline:
//! - Missing value imputation (median / most frequent)
//! - Degree-2 polynomial expansion and standard scaling of numeric columns
//! - One-hot encoding of categorical columns, unknown categories ignored
//! - Mutual-information feature selection

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;
pub mod feature_selection;

pub use config::PreprocessingConfig;
pub use encoder::OneHotEncoder;
pub use feature_selection::{FeatureSelector, SelectionMethod};
pub use imputer::{CategoricalImputer, ImputeStrategy, Imputer};
pub use pipeline::DataPreprocessor;
pub use scaler::{Scaler, ScalerType};

use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}
