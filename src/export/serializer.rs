//! Model serialization utilities
//!
//! A trained pipeline is written as one bincode file: an envelope with
//! magic bytes, a format version, metadata and an FNV-1a checksum around
//! the serialized [`FittedPipeline`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{ObesityError, Result};
use crate::optimizer::TrainingOutcome;
use crate::pipeline::{CandidateConfig, FittedPipeline};

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,
    /// Crate version that wrote the artifact
    pub version: String,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Class labels in probability-column order
    pub labels: Vec<String>,
    /// Columns fed to the stack after selection
    pub feature_names: Vec<String>,
    /// Winning configuration
    pub candidate: CandidateConfig,
    pub cv_mean_accuracy: Option<f64>,
    pub cv_std_accuracy: Option<f64>,
    pub holdout_accuracy: Option<f64>,
    /// Additional metrics
    pub metrics: BTreeMap<String, f64>,
}

impl ModelMetadata {
    /// Metadata describing a fitted pipeline, without scores
    pub fn for_pipeline(name: impl Into<String>, pipeline: &FittedPipeline) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now().to_rfc3339(),
            labels: pipeline.classes().to_vec(),
            feature_names: pipeline.feature_names(),
            candidate: pipeline.config().candidate.clone(),
            cv_mean_accuracy: None,
            cv_std_accuracy: None,
            holdout_accuracy: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Metadata for the result of a full training run
    pub fn from_outcome(name: impl Into<String>, outcome: &TrainingOutcome) -> Self {
        let best = outcome.sweep.best_trial();
        let mut metadata = Self::for_pipeline(name, &outcome.pipeline)
            .add_metric("holdout_macro_f1", outcome.holdout.macro_avg.f1_score)
            .add_metric("holdout_weighted_f1", outcome.holdout.weighted_avg.f1_score)
            .add_metric("sweep_failed_candidates", outcome.sweep.n_failed() as f64);
        metadata.cv_mean_accuracy = best.mean_score();
        metadata.cv_std_accuracy = best.std_score();
        metadata.holdout_accuracy = Some(outcome.holdout.accuracy);
        metadata
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Model metadata
    pub metadata: ModelMetadata,
    /// Serialized pipeline
    pub model_data: Vec<u8>,
    /// FNV-1a checksum of `model_data`
    pub checksum: u64,
}

impl SerializedModel {
    /// Magic bytes for obesity-stack model files
    pub const MAGIC: [u8; 4] = *b"OBST";
    /// Current format version
    pub const VERSION: u32 = 1;

    /// Create new serialized model
    pub fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(ObesityError::SerializationError(
                "Not a model file (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(ObesityError::SerializationError(format!(
                "Unsupported model format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(ObesityError::SerializationError(
                "Model file checksum mismatch".to_string(),
            ));
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        let envelope: SerializedModel = bincode::deserialize(&bytes).map_err(|e| {
            ObesityError::SerializationError(format!("Failed to read model file {}: {}", path.display(), e))
        })?;
        envelope.validate()?;
        Ok(envelope)
    }
}

/// Write a fitted pipeline and its metadata to `path`
pub fn save_model(pipeline: &FittedPipeline, metadata: ModelMetadata, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let model_data = bincode::serialize(pipeline)
        .map_err(|e| ObesityError::SerializationError(format!("Failed to serialize: {}", e)))?;
    let envelope = SerializedModel::new(metadata, model_data);
    let bytes = bincode::serialize(&envelope)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved model");
    Ok(())
}

/// Read, verify and deserialize a model file
pub fn load_model(path: impl AsRef<Path>) -> Result<(FittedPipeline, ModelMetadata)> {
    let path = path.as_ref();
    let envelope = SerializedModel::read(path)?;
    let pipeline: FittedPipeline = bincode::deserialize(&envelope.model_data)
        .map_err(|e| ObesityError::SerializationError(format!("Failed to deserialize: {}", e)))?;
    tracing::debug!(path = %path.display(), name = %envelope.metadata.name, "Loaded model");
    Ok((pipeline, envelope.metadata))
}

/// Read only the verified metadata of a model file
pub fn load_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    Ok(SerializedModel::read(path.as_ref())?.metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        let metadata = ModelMetadata {
            name: "m".to_string(),
            version: "0".to_string(),
            trained_at: String::new(),
            labels: vec![],
            feature_names: vec![],
            candidate: CandidateConfig::default(),
            cv_mean_accuracy: None,
            cv_std_accuracy: None,
            holdout_accuracy: None,
            metrics: BTreeMap::new(),
        };
        let mut model = SerializedModel::new(metadata, vec![1, 2, 3, 4]);
        assert!(model.verify_checksum());
        assert!(model.validate().is_ok());

        model.model_data[0] = 9;
        assert!(!model.verify_checksum());
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(SerializedModel::compute_checksum(b""), 14695981039346656037);
        assert_eq!(SerializedModel::compute_checksum(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(load_model("/nonexistent/model.bin"), Err(ObesityError::IoError(_))));
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not a model").unwrap();
        assert!(load_model(&path).is_err());
    }
}
