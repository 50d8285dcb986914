//! Candidate configuration space and search strategies

use super::sweep::TrialResult;
use crate::error::{ObesityError, Result};
use crate::pipeline::CandidateConfig;
use crate::synthetic::OversamplingStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered list of candidate configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpace {
    candidates: Vec<CandidateConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpaceFile {
    List(Vec<CandidateConfig>),
    Wrapped { candidates: Vec<CandidateConfig> },
}

impl ConfigSpace {
    pub fn new(candidates: Vec<CandidateConfig>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(ObesityError::ConfigError("Configuration space is empty".to_string()));
        }
        for candidate in &candidates {
            candidate.validate()?;
        }
        Ok(Self { candidates })
    }

    /// The six hand-picked candidates, plus two Borderline-SMOTE variants
    /// when that sampler is compiled in
    pub fn default_space() -> Self {
        let base = CandidateConfig::default;
        let mut candidates = vec![
            base().with_selector(Some(98.0)).with_name("sel98-k3-320x160"),
            base().with_selector(None).with_name("nosel-k3-320x160"),
            base()
                .with_selector(Some(98.0))
                .with_hidden_layers(vec![256, 128])
                .with_name("sel98-k3-256x128"),
            base()
                .with_selector(Some(98.0))
                .with_boosting(1200, 0.045)
                .with_name("sel98-k3-320x160-gb1200"),
            base()
                .with_selector(Some(98.0))
                .with_oversampling(OversamplingStrategy::Smote { k_neighbors: 5 })
                .with_name("sel98-k5-320x160"),
            base()
                .with_selector(None)
                .with_oversampling(OversamplingStrategy::Smote { k_neighbors: 5 })
                .with_name("nosel-k5-320x160"),
        ];
        if OversamplingStrategy::borderline_available() {
            let borderline = OversamplingStrategy::BorderlineSmote { k_neighbors: 3 };
            candidates.push(
                base()
                    .with_selector(Some(98.0))
                    .with_oversampling(borderline)
                    .with_name("sel98-bsmote3-320x160"),
            );
            candidates.push(
                base()
                    .with_selector(None)
                    .with_oversampling(borderline)
                    .with_name("nosel-bsmote3-320x160"),
            );
        }
        Self { candidates }
    }

    /// Load a space from JSON: either a list of candidates or
    /// `{"candidates": [...]}`. Omitted candidate fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let candidates = match serde_json::from_str::<SpaceFile>(text)? {
            SpaceFile::List(c) | SpaceFile::Wrapped { candidates: c } => c,
        };
        Self::new(candidates)
    }

    pub fn candidates(&self) -> &[CandidateConfig] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&CandidateConfig> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl Default for ConfigSpace {
    fn default() -> Self {
        Self::default_space()
    }
}

/// Decides which candidate to evaluate next
pub trait SearchStrategy: Send {
    /// Index into `space` of the next candidate, `None` when done
    fn next_candidate(&mut self, space: &ConfigSpace, history: &[TrialResult]) -> Option<usize>;

    fn name(&self) -> &'static str;
}

/// Evaluates every candidate once, in order
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSearch;

impl SearchStrategy for ExhaustiveSearch {
    fn next_candidate(&mut self, space: &ConfigSpace, history: &[TrialResult]) -> Option<usize> {
        let next = history.len();
        (next < space.len()).then_some(next)
    }

    fn name(&self) -> &'static str {
        "exhaustive"
    }
}
