//! Cross-validation implementations

use crate::error::{ObesityError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate train/test splits. Stratified splitting requires `y`.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<usize>>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => self.k_fold_split(n_samples, *n_splits, *shuffle),
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    ObesityError::ValidationError("StratifiedKFold requires target array".to_string())
                })?;
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn check_splits(n_samples: usize, n_splits: usize) -> Result<()> {
        if n_splits < 2 {
            return Err(ObesityError::ValidationError("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(ObesityError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }
        Ok(())
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        Self::check_splits(n_samples, n_splits)?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut current = 0;
        for (i, fold) in folds.iter_mut().enumerate() {
            let size = if i < remainder { base + 1 } else { base };
            fold.extend_from_slice(&indices[current..current + size]);
            current += size;
        }
        Ok(Self::folds_to_splits(folds))
    }

    fn stratified_k_fold_split(&self, y: &Array1<usize>, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        Self::check_splits(y.len(), n_splits)?;

        let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &class) in y.iter().enumerate() {
            class_indices.entry(class).or_default().push(idx);
        }

        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing where the previous class
        // stopped so fold sizes differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[offset % n_splits].push(idx);
                offset += 1;
            }
        }
        Ok(Self::folds_to_splits(folds))
    }

    fn folds_to_splits(mut folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }
        (0..folds.len())
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect()
    }
}

/// Stratified train/test split.
///
/// Each class contributes `test_size` of its rows to the test side (largest
/// remainder rounding so the total is `ceil(n * test_size)`), while keeping
/// at least one row of every class on the training side.
pub fn stratified_train_test_split(
    y: &Array1<usize>,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ObesityError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &class) in y.iter().enumerate() {
        class_indices.entry(class).or_default().push(idx);
    }

    let n_test_total = (y.len() as f64 * test_size).ceil() as usize;
    let mut allocation: Vec<(usize, usize, f64)> = class_indices
        .iter()
        .map(|(&class, idx)| {
            let exact = idx.len() as f64 * test_size;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();

    let mut allocated: usize = allocation.iter().map(|a| a.1).sum();
    let mut by_remainder: Vec<usize> = (0..allocation.len()).collect();
    by_remainder.sort_by(|&a, &b| allocation[b].2.total_cmp(&allocation[a].2).then(a.cmp(&b)));
    for &i in by_remainder.iter().cycle().take(allocation.len() * 2) {
        if allocated >= n_test_total {
            break;
        }
        let class_size = class_indices[&allocation[i].0].len();
        if allocation[i].1 + 1 < class_size {
            allocation[i].1 += 1;
            allocated += 1;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len() - allocated);
    let mut test = Vec::with_capacity(allocated);
    for (class, n_test, _) in allocation {
        let mut indices = class_indices[&class].clone();
        indices.shuffle(&mut rng);
        let n_test = n_test.min(indices.len().saturating_sub(1));
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds.max(1) as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds.max(1) as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
