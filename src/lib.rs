//! Obesity category classifier
//!
//! A stacked-ensemble training pipeline for the seven-class obesity level
//! problem and an HTTP service that serves the trained model.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Raw records, labels and sample data
//! - [`feature_engineering`] - BMI and lifestyle indicator columns
//! - [`preprocessing`] - Imputation, scaling, encoding, feature selection
//! - [`synthetic`] - SMOTE and Borderline-SMOTE oversampling
//!
//! ## Modelling
//! - [`training`] - Base learners, cross-validation, metrics
//! - [`ensemble`] - Stacking classifier
//! - [`pipeline`] - Fitted end-to-end pipeline
//! - [`optimizer`] - Candidate sweep and final refit
//!
//! ## Services
//! - [`export`] - Model artifact serialization
//! - [`inference`] - Request validation and prediction service
//! - [`server`] - HTTP server
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod dataset;
pub mod feature_engineering;
pub mod preprocessing;
pub mod synthetic;

// Modelling
pub mod training;
pub mod ensemble;
pub mod pipeline;
pub mod optimizer;

// Services
pub mod export;
pub mod inference;
pub mod server;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{ObesityError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ObesityError, Result};

    // Data
    pub use crate::dataset::{generate_sample_dataset, CellValue, Dataset, LabelEncoder, RawRecord};
    pub use crate::feature_engineering::FeatureEngineer;
    pub use crate::preprocessing::{DataPreprocessor, FeatureSelector, PreprocessingConfig};
    pub use crate::synthetic::{OversamplingStrategy, SMOTE};
    pub use crate::utils::DataLoader;

    // Modelling
    pub use crate::training::{
        ClassificationReport, Classifier, CrossValidator, GradientBoostingClassifier, LogisticRegression,
        MLPClassifier,
    };
    pub use crate::ensemble::{StackingClassifier, StackingConfig};
    pub use crate::pipeline::{CandidateConfig, FittedPipeline, PipelineConfig};
    pub use crate::optimizer::{ConfigSpace, SweepDriver, TrainingConfig, TrainingOutcome};

    // Services
    pub use crate::export::{load_model, save_model, ModelMetadata};
    pub use crate::inference::{InferenceService, Prediction};
    pub use crate::server::{create_router, AppState, ServerConfig};
}
