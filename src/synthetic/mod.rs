//! Class-imbalance correction by synthetic oversampling
//!
//! Provides:
//! - SMOTE (Synthetic Minority Over-sampling Technique)
//! - Borderline-SMOTE, behind the `borderline-smote` cargo feature
//! - [`OversamplingStrategy`], the requested variant, and its resolution
//!   against what this build supports
//!
//! Resampling is only ever applied to a training fold inside a pipeline fit.

mod smote;

#[cfg(feature = "borderline-smote")]
pub use smote::BorderlineSMOTE;
pub use smote::SMOTE;

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Original rows followed by synthetic rows
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<usize>,
    /// Number of synthetic samples generated per class, by class index
    pub n_synthetic: BTreeMap<usize, usize>,
}

impl ResampleResult {
    pub fn total_synthetic(&self) -> usize {
        self.n_synthetic.values().sum()
    }
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<usize>) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// Requested oversampling variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversamplingStrategy {
    /// Train on the fold as is
    None,
    /// Regular SMOTE with `k_neighbors` same-class neighbours
    Smote { k_neighbors: usize },
    /// Borderline-SMOTE; falls back to regular SMOTE when not compiled in
    BorderlineSmote { k_neighbors: usize },
}

impl Default for OversamplingStrategy {
    fn default() -> Self {
        OversamplingStrategy::Smote { k_neighbors: 3 }
    }
}

/// Oversampler chosen for this build
#[derive(Debug, Clone)]
pub enum ResolvedOversampler {
    Disabled,
    Regular(SMOTE),
    #[cfg(feature = "borderline-smote")]
    Borderline(BorderlineSMOTE),
}

impl OversamplingStrategy {
    /// Whether Borderline-SMOTE is compiled into this build
    pub fn borderline_available() -> bool {
        cfg!(feature = "borderline-smote")
    }

    pub fn is_borderline(&self) -> bool {
        matches!(self, OversamplingStrategy::BorderlineSmote { .. })
    }

    /// Pick the concrete sampler. An unavailable variant degrades to regular
    /// SMOTE with a warning.
    pub fn resolve(&self, seed: u64) -> ResolvedOversampler {
        match *self {
            OversamplingStrategy::None => ResolvedOversampler::Disabled,
            OversamplingStrategy::Smote { k_neighbors } => {
                ResolvedOversampler::Regular(SMOTE::new().with_k_neighbors(k_neighbors).with_seed(seed))
            }
            #[cfg(feature = "borderline-smote")]
            OversamplingStrategy::BorderlineSmote { k_neighbors } => ResolvedOversampler::Borderline(
                BorderlineSMOTE::new().with_k_neighbors(k_neighbors).with_seed(seed),
            ),
            #[cfg(not(feature = "borderline-smote"))]
            OversamplingStrategy::BorderlineSmote { k_neighbors } => {
                tracing::warn!("Borderline-SMOTE not available in this build, using regular SMOTE");
                ResolvedOversampler::Regular(SMOTE::new().with_k_neighbors(k_neighbors).with_seed(seed))
            }
        }
    }
}

impl ResolvedOversampler {
    pub fn name(&self) -> &'static str {
        match self {
            ResolvedOversampler::Disabled => "none",
            ResolvedOversampler::Regular(_) => "smote",
            #[cfg(feature = "borderline-smote")]
            ResolvedOversampler::Borderline(_) => "borderline-smote",
        }
    }

    /// Resample a training fold; `Disabled` returns the input unchanged
    pub fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        match self {
            ResolvedOversampler::Disabled => Ok(ResampleResult {
                x: x.clone(),
                y: y.clone(),
                n_synthetic: BTreeMap::new(),
            }),
            ResolvedOversampler::Regular(smote) => smote.fit_resample(x, y),
            #[cfg(feature = "borderline-smote")]
            ResolvedOversampler::Borderline(smote) => smote.fit_resample(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_helpers() {
        let y = array![2, 0, 2, 1, 2];
        let counts = class_counts(&y);
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![(0, 1), (1, 1), (2, 3)]);
        assert_eq!(class_indices(&y)[&2], vec![0, 2, 4]);
    }

    #[test]
    fn test_resolve_regular() {
        let resolved = OversamplingStrategy::Smote { k_neighbors: 3 }.resolve(42);
        assert_eq!(resolved.name(), "smote");
        assert_eq!(OversamplingStrategy::None.resolve(42).name(), "none");
    }

    #[test]
    fn test_resolve_borderline_matches_capability() {
        let resolved = OversamplingStrategy::BorderlineSmote { k_neighbors: 3 }.resolve(42);
        if OversamplingStrategy::borderline_available() {
            assert_eq!(resolved.name(), "borderline-smote");
        } else {
            assert_eq!(resolved.name(), "smote");
        }
    }

    #[test]
    fn test_disabled_passthrough() {
        let x = array![[1.0], [2.0]];
        let y = array![0, 1];
        let out = ResolvedOversampler::Disabled.fit_resample(&x, &y).unwrap();
        assert_eq!(out.x, x);
        assert_eq!(out.total_synthetic(), 0);
    }

    #[test]
    fn test_strategy_json() {
        let s: OversamplingStrategy = serde_json::from_str(r#"{"borderline_smote":{"k_neighbors":5}}"#).unwrap();
        assert_eq!(s, OversamplingStrategy::BorderlineSmote { k_neighbors: 5 });
    }
}
