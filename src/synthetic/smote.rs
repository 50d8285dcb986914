//! SMOTE and variants

use crate::error::{ObesityError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Ordered (distance, index) pair for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
}

/// `k` nearest rows of `x` (restricted to `candidates`) to row `point`,
/// excluding the point itself, nearest first
fn nearest_neighbors(x: &Array2<f64>, point: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let row = x.row(point);
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
    for &i in candidates {
        if i == point {
            continue;
        }
        let candidate = DistIdx(squared_distance(row, x.row(i)), i);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }
    heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
}

/// SMOTE (Synthetic Minority Over-sampling Technique)
///
/// Every class below the majority count is topped up to it by interpolating
/// between a random class sample and one of its `k` nearest same-class
/// neighbours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
    /// Target samples per class
    target_counts: Option<BTreeMap<usize, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 3,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Synthesize `n` rows for one class from the given seed rows
    fn synthesize(
        &self,
        x: &Array2<f64>,
        class_rows: &[usize],
        seeds: &[usize],
        n: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Vec<Vec<f64>> {
        let k = self.k_neighbors.min(class_rows.len().saturating_sub(1));
        let mut out = Vec::with_capacity(n);

        // A lone sample has no neighbour to interpolate towards
        if k == 0 {
            let row = x.row(class_rows[0]).to_vec();
            out.resize(n, row);
            return out;
        }

        let neighbors: Vec<Vec<usize>> = seeds
            .iter()
            .map(|&s| nearest_neighbors(x, s, class_rows, k))
            .collect();

        for _ in 0..n {
            let pick = rng.gen_range(0..seeds.len());
            let sample = x.row(seeds[pick]);
            let neighbor = x.row(neighbors[pick][rng.gen_range(0..neighbors[pick].len())]);
            let gap: f64 = rng.gen();
            out.push(
                sample
                    .iter()
                    .zip(neighbor.iter())
                    .map(|(&p, &q)| p + gap * (q - p))
                    .collect(),
            );
        }
        out
    }

    /// Original rows followed by the synthetic ones
    fn assemble(
        x: &Array2<f64>,
        y: &Array1<usize>,
        synthetic: Vec<(usize, Vec<Vec<f64>>)>,
    ) -> ResampleResult {
        let n_original = x.nrows();
        let n_features = x.ncols();
        let mut rows: Vec<&[f64]> = Vec::new();
        let mut labels: Vec<usize> = y.to_vec();
        let mut n_synthetic = BTreeMap::new();

        for (class, samples) in &synthetic {
            n_synthetic.insert(*class, samples.len());
            for s in samples {
                rows.push(s.as_slice());
                labels.push(*class);
            }
        }

        let result_x = Array2::from_shape_fn((n_original + rows.len(), n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                rows[i - n_original][j]
            }
        });

        ResampleResult {
            x: result_x,
            y: Array1::from_vec(labels),
            n_synthetic,
        }
    }

    fn targets(&self) -> Result<&BTreeMap<usize, usize>> {
        self.target_counts
            .as_ref()
            .ok_or_else(|| ObesityError::ValidationError("SMOTE not fitted".to_string()))
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let counts = class_counts(y);
        if counts.len() < 2 {
            return Err(ObesityError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        self.target_counts = Some(counts.keys().map(|&c| (c, max_count)).collect());
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        let targets = self.targets()?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let indices = class_indices(y);

        let mut synthetic = Vec::new();
        for (class, rows) in &indices {
            let target = targets.get(class).copied().unwrap_or(rows.len());
            let n_to_generate = target.saturating_sub(rows.len());
            if n_to_generate == 0 {
                continue;
            }
            synthetic.push((*class, self.synthesize(x, rows, rows, n_to_generate, &mut rng)));
        }

        tracing::debug!(
            n_original = x.nrows(),
            n_synthetic = synthetic.iter().map(|(_, s)| s.len()).sum::<usize>(),
            "SMOTE resampled"
        );
        Ok(Self::assemble(x, y, synthetic))
    }
}

/// Borderline SMOTE (type 1)
///
/// Only "danger" samples seed the interpolation: those whose `m` nearest
/// neighbours over the whole fold are at least half, but not all, from
/// other classes. A class without danger samples seeds from all of them.
#[cfg(feature = "borderline-smote")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderlineSMOTE {
    /// Base SMOTE
    smote: SMOTE,
    /// Number of neighbors for borderline detection
    m_neighbors: usize,
}

#[cfg(feature = "borderline-smote")]
impl Default for BorderlineSMOTE {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "borderline-smote")]
impl BorderlineSMOTE {
    /// Create new Borderline SMOTE
    pub fn new() -> Self {
        Self {
            smote: SMOTE::new(),
            m_neighbors: 10,
        }
    }

    /// Set k neighbors for SMOTE
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.smote = self.smote.with_k_neighbors(k);
        self
    }

    /// Set m neighbors for borderline detection
    pub fn with_m_neighbors(mut self, m: usize) -> Self {
        self.m_neighbors = m.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.smote = self.smote.with_seed(seed);
        self
    }

    fn is_danger(&self, point: usize, x: &Array2<f64>, y: &Array1<usize>, all_rows: &[usize]) -> bool {
        let m = self.m_neighbors.min(x.nrows().saturating_sub(1));
        if m == 0 {
            return false;
        }
        let n_other = nearest_neighbors(x, point, all_rows, m)
            .into_iter()
            .filter(|&i| y[i] != y[point])
            .count();
        2 * n_other >= m && n_other < m
    }
}

#[cfg(feature = "borderline-smote")]
impl Sampler for BorderlineSMOTE {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        self.smote.fit(x, y)
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        let targets = self.smote.targets()?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.smote.seed);
        let indices = class_indices(y);
        let all_rows: Vec<usize> = (0..x.nrows()).collect();

        let mut synthetic = Vec::new();
        for (class, rows) in &indices {
            let target = targets.get(class).copied().unwrap_or(rows.len());
            let n_to_generate = target.saturating_sub(rows.len());
            if n_to_generate == 0 {
                continue;
            }

            let danger: Vec<usize> = rows
                .iter()
                .copied()
                .filter(|&i| self.is_danger(i, x, y, &all_rows))
                .collect();
            let seeds = if danger.is_empty() { rows.as_slice() } else { danger.as_slice() };

            tracing::debug!(class, n_danger = danger.len(), n_to_generate, "Borderline seeds");
            synthetic.push((*class, self.smote.synthesize(x, rows, seeds, n_to_generate, &mut rng)));
        }

        Ok(SMOTE::assemble(x, y, synthetic))
    }
}
