//! Mutual-information feature selection

use crate::error::{ObesityError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How many features to keep after scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Keep the top `percentile` percent of features
    Percentile { percentile: f64 },
    /// Keep the `k` highest-scoring features
    KBest { k: usize },
}

/// Scores features by mutual information with a discrete label and keeps
/// the best ones. Selected columns keep their original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    method: SelectionMethod,
    scores: Option<Vec<f64>>,
    selected_indices: Option<Vec<usize>>,
    n_features_in: usize,
}

impl FeatureSelector {
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            scores: None,
            selected_indices: None,
            n_features_in: 0,
        }
    }

    /// Create percentile selector
    pub fn percentile(percentile: f64) -> Self {
        Self::new(SelectionMethod::Percentile {
            percentile: percentile.clamp(0.0, 100.0),
        })
    }

    /// Create k-best selector
    pub fn k_best(k: usize) -> Self {
        Self::new(SelectionMethod::KBest { k })
    }

    pub fn fit(&mut self, x: ArrayView2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        let n_features = x.ncols();
        if n_features == 0 {
            return Err(ObesityError::PreprocessingError("No features to select from".to_string()));
        }

        let n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        let scores: Vec<f64> = x
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(|col| mutual_information(col, y.view(), n_classes))
            .collect();

        let n_keep = match self.method {
            SelectionMethod::Percentile { percentile } => {
                ((n_features as f64 * percentile / 100.0).floor() as usize).max(1)
            }
            SelectionMethod::KBest { k } => k.clamp(1, n_features),
        };

        // Highest score first; ties go to the lower column index
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        let mut selected: Vec<usize> = order.into_iter().take(n_keep).collect();
        selected.sort_unstable();

        tracing::debug!(n_features, n_keep, "Fitted feature selector");

        self.scores = Some(scores);
        self.selected_indices = Some(selected);
        self.n_features_in = n_features;
        Ok(self)
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected_indices.as_ref().ok_or(ObesityError::ModelNotFitted)?;
        if x.ncols() != self.n_features_in {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", self.n_features_in),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.select(Axis(1), selected))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>, y: &Array1<usize>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }

    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected_indices.as_deref()
    }

    pub fn scores(&self) -> Option<&[f64]> {
        self.scores.as_deref()
    }

    pub fn selected_names(&self, names: &[String]) -> Option<Vec<String>> {
        self.selected_indices
            .as_ref()
            .map(|idx| idx.iter().filter_map(|&i| names.get(i).cloned()).collect())
    }
}

/// Mutual information (nats) between an equal-width binned feature and a
/// class label, with `clamp(sqrt(n), 2, 20)` bins
pub fn mutual_information(x: ArrayView1<f64>, y: ArrayView1<usize>, n_classes: usize) -> f64 {
    let n = x.len();
    if n < 2 || n_classes == 0 {
        return 0.0;
    }

    let n_bins = ((n as f64).sqrt() as usize).clamp(2, 20);
    let x_bins = discretize(x, n_bins);

    let mut joint = vec![0usize; n_bins * n_classes];
    let mut x_counts = vec![0usize; n_bins];
    let mut y_counts = vec![0usize; n_classes];
    for (&xb, &yc) in x_bins.iter().zip(y.iter()) {
        joint[xb * n_classes + yc] += 1;
        x_counts[xb] += 1;
        y_counts[yc] += 1;
    }

    let total = n as f64;
    let mut mi = 0.0;
    for xb in 0..n_bins {
        for yc in 0..n_classes {
            let count = joint[xb * n_classes + yc];
            if count == 0 {
                continue;
            }
            let p_xy = count as f64 / total;
            let p_x = x_counts[xb] as f64 / total;
            let p_y = y_counts[yc] as f64 / total;
            mi += p_xy * (p_xy / (p_x * p_y)).ln();
        }
    }
    mi.max(0.0)
}

fn discretize(x: ArrayView1<f64>, n_bins: usize) -> Vec<usize> {
    let min_val = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_val = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let range = max_val - min_val;
    if !(range > 0.0) {
        return vec![0; x.len()];
    }

    let bin_width = range / n_bins as f64;
    x.iter()
        .map(|&v| (((v - min_val) / bin_width) as usize).min(n_bins - 1))
        .collect()
}
