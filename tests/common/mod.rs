//! Shared fixtures for integration tests

#![allow(dead_code)]

use obesity_stack::dataset::{generate_sample_dataset, Dataset, RawRecord};
use obesity_stack::pipeline::{CandidateConfig, FittedPipeline, PipelineConfig};
use obesity_stack::training::{LogisticRegressionConfig, MLPConfig};
use serde_json::{json, Value};

/// Seeded sample data
pub fn sample_dataset(n: usize) -> Dataset {
    generate_sample_dataset(n, 42).unwrap()
}

/// A candidate that trains in well under a second on a few hundred rows
pub fn fast_candidate(name: &str) -> CandidateConfig {
    let mut candidate = CandidateConfig::new(name)
        .with_mlp(MLPConfig::new().with_hidden_layers(vec![16]).with_max_iter(40))
        .with_boosting(15, 0.1);
    candidate.logistic = LogisticRegressionConfig::new().with_c(2.0).with_max_iter(300);
    candidate.meta = LogisticRegressionConfig::new().with_c(3.0).with_max_iter(300);
    candidate
}

pub fn fit_fast_pipeline(dataset: &Dataset) -> FittedPipeline {
    let config = PipelineConfig::new(fast_candidate("fast")).with_stack_folds(3);
    FittedPipeline::fit(dataset, &config).unwrap()
}

/// One complete request body
pub fn valid_payload() -> Value {
    json!({
        "Gender": "Female",
        "Age": 21,
        "Height": 1.62,
        "Weight": 64.0,
        "family_history_with_overweight": "yes",
        "FAVC": "no",
        "FCVC": 2,
        "NCP": 3,
        "CAEC": "Sometimes",
        "SMOKE": "no",
        "CH2O": 2,
        "SCC": "no",
        "FAF": 0,
        "TUE": 1,
        "CALC": "no",
        "MTRANS": "Public_Transportation"
    })
}

pub fn valid_record() -> RawRecord {
    obesity_stack::inference::validate_payload(&valid_payload()).unwrap()
}
