//! Inference service
//!
//! Owns one fitted pipeline loaded from disk. The artifact is read once;
//! afterwards the service is read-only and can be shared behind an `Arc`.

use crate::dataset::RawRecord;
use crate::error::{ObesityError, Result};
use crate::export::{load_model, ModelMetadata};
use crate::pipeline::{max_probability, FittedPipeline};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Prediction for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Max class probability; `None` when the model exposes no probabilities
    pub confidence: Option<f64>,
}

/// Lifecycle of the loaded model
#[derive(Debug, Clone)]
pub enum ServiceStatus {
    NotLoaded,
    Ready(Arc<LoadedModel>),
    Failed(String),
}

/// A loaded pipeline with its metadata
#[derive(Debug)]
pub struct LoadedModel {
    pub pipeline: FittedPipeline,
    pub metadata: ModelMetadata,
}

/// Construct → `load` → ready
#[derive(Debug)]
pub struct InferenceService {
    model_path: PathBuf,
    status: RwLock<ServiceStatus>,
}

impl InferenceService {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            status: RwLock::new(ServiceStatus::NotLoaded),
        }
    }

    /// Service around an already fitted pipeline
    pub fn from_pipeline(pipeline: FittedPipeline, metadata: ModelMetadata) -> Self {
        Self {
            model_path: PathBuf::new(),
            status: RwLock::new(ServiceStatus::Ready(Arc::new(LoadedModel { pipeline, metadata }))),
        }
    }

    /// Load the artifact. Calling again after a successful load is a no-op;
    /// a failure is remembered and returned.
    pub fn load(&self) -> Result<()> {
        let mut status = self.status.write();
        if let ServiceStatus::Ready(_) = *status {
            return Ok(());
        }

        let start = Instant::now();
        match load_model(&self.model_path) {
            Ok((pipeline, metadata)) => {
                tracing::info!(
                    path = %self.model_path.display(),
                    name = %metadata.name,
                    classes = pipeline.classes().len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model loaded"
                );
                *status = ServiceStatus::Ready(Arc::new(LoadedModel { pipeline, metadata }));
                Ok(())
            }
            Err(e) => {
                tracing::error!(path = %self.model_path.display(), error = %e, "Failed to load model");
                *status = ServiceStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.status.read(), ServiceStatus::Ready(_))
    }

    pub fn status(&self) -> ServiceStatus {
        self.status.read().clone()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn model(&self) -> Result<Arc<LoadedModel>> {
        match &*self.status.read() {
            ServiceStatus::Ready(model) => Ok(Arc::clone(model)),
            ServiceStatus::NotLoaded => Err(ObesityError::InferenceError("Model is not loaded".to_string())),
            ServiceStatus::Failed(msg) => Err(ObesityError::InferenceError(format!("Model failed to load: {}", msg))),
        }
    }

    pub fn metadata(&self) -> Result<ModelMetadata> {
        Ok(self.model()?.metadata.clone())
    }

    /// Predict one validated record
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        let model = self.model()?;
        let (label, confidence) = model.pipeline.predict_one(record)?;
        Ok(Prediction {
            label,
            confidence: confidence.is_finite().then_some(confidence),
        })
    }

    /// Predict a batch of records
    pub fn predict_batch(&self, records: &[RawRecord]) -> Result<Vec<Prediction>> {
        let model = self.model()?;
        let proba = model.pipeline.predict_proba(records)?;
        let labels = model.pipeline.classes();
        proba
            .rows()
            .into_iter()
            .map(|row| {
                let (best, p) = max_probability(row)?;
                let label = labels
                    .get(best)
                    .cloned()
                    .ok_or_else(|| ObesityError::InferenceError(format!("Unknown class index {}", best)))?;
                Ok(Prediction {
                    label,
                    confidence: p.is_finite().then_some(p),
                })
            })
            .collect()
    }
}
