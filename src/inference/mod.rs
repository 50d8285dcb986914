//! Inference module
//!
//! Loads a trained artifact once and serves single-record predictions.
//! Request bodies are validated here before they reach the model.

mod engine;
pub mod validation;

pub use engine::{InferenceService, LoadedModel, Prediction, ServiceStatus};
pub use validation::{parse_body, validate_payload, RequestError};
