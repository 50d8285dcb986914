//! Histogram-based regression trees fitted to gradient statistics
//!
//! Features are quantised once into at most 255 bins; trees are grown
//! depth-first on per-bin gradient/hessian sums and store raw-value
//! thresholds so prediction works on unbinned data.

use crate::error::{ObesityError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper limit on bins per feature, set by the `u8` bin index
pub const MAX_BINS: usize = 256;

/// Per-feature quantile thresholds. A value `v` falls in bin `b` when
/// `thresholds[b - 1] < v <= thresholds[b]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBinner {
    thresholds: Vec<Vec<f64>>,
}

impl FeatureBinner {
    pub fn fit(x: ArrayView2<f64>, max_bins: usize) -> Result<Self> {
        if !(2..=MAX_BINS).contains(&max_bins) {
            return Err(ObesityError::InvalidParameter {
                name: "max_bins".to_string(),
                value: max_bins.to_string(),
                reason: format!("must be in 2..={}", MAX_BINS),
            });
        }
        let thresholds = x
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(|col| Self::column_thresholds(col, max_bins))
            .collect();
        Ok(Self { thresholds })
    }

    fn column_thresholds(col: ArrayView1<f64>, max_bins: usize) -> Vec<f64> {
        let mut sorted: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mut unique = sorted.clone();
        unique.dedup();

        if unique.len() <= max_bins {
            return unique.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        }

        let n = sorted.len();
        let max = unique[unique.len() - 1];
        let mut cuts: Vec<f64> = (1..max_bins)
            .map(|q| sorted[(q * n / max_bins).min(n - 1)])
            .filter(|&v| v < max)
            .collect();
        cuts.dedup();
        cuts
    }

    pub fn n_features(&self) -> usize {
        self.thresholds.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }

    /// Column-major bin indices, `binned[feature][row]`
    pub fn transform(&self, x: ArrayView2<f64>) -> Vec<Vec<u8>> {
        x.axis_iter(Axis(1))
            .into_par_iter()
            .zip(self.thresholds.par_iter())
            .map(|(col, cuts)| {
                col.iter()
                    .map(|&v| cuts.partition_point(|&t| t < v) as u8)
                    .collect()
            })
            .collect()
    }
}

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node; `x <= threshold` (or NaN) goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        gain: f64,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] > *threshold { right } else { left };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Growth limits for [`RegressionTree`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// L2 penalty on leaf values
    pub reg_lambda: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_leaf: 1,
            min_child_weight: 1e-3,
            reg_lambda: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    g: f64,
    h: f64,
    n: usize,
}

impl BinStats {
    fn add(&mut self, other: &BinStats) {
        self.g += other.g;
        self.h += other.h;
        self.n += other.n;
    }

    fn minus(&self, other: &BinStats) -> BinStats {
        BinStats {
            g: self.g - other.g,
            h: self.h - other.h,
            n: self.n - other.n,
        }
    }
}

/// `hist[feature][bin]`
type Histogram = Vec<Vec<BinStats>>;

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct GrowContext<'a> {
    binned: &'a [Vec<u8>],
    binner: &'a FeatureBinner,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a TreeParams,
}

impl GrowContext<'_> {
    fn histogram(&self, rows: &[usize]) -> Histogram {
        self.binned
            .par_iter()
            .enumerate()
            .map(|(f, bins)| {
                let mut hist = vec![BinStats::default(); self.binner.n_bins(f)];
                for &r in rows {
                    let s = &mut hist[bins[r] as usize];
                    s.g += self.grad[r];
                    s.h += self.hess[r];
                    s.n += 1;
                }
                hist
            })
            .collect()
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.params.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -g / denom
        }
    }

    fn best_split(&self, hist: &Histogram, total: &BinStats) -> Option<SplitCandidate> {
        let parent = self.score(total.g, total.h);
        let mut best: Option<SplitCandidate> = None;
        for (feature, bins) in hist.iter().enumerate() {
            let mut left = BinStats::default();
            for (bin, stats) in bins.iter().enumerate().take(bins.len().saturating_sub(1)) {
                left.add(stats);
                let right = total.minus(&left);
                if left.n < self.params.min_samples_leaf || right.n < self.params.min_samples_leaf {
                    continue;
                }
                if left.h < self.params.min_child_weight || right.h < self.params.min_child_weight {
                    continue;
                }
                let gain = self.score(left.g, left.h) + self.score(right.g, right.h) - parent;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }
        best
    }

    fn grow(&self, rows: Vec<usize>, hist: Histogram, depth: usize) -> TreeNode {
        let total = hist
            .first()
            .map(|bins| {
                let mut t = BinStats::default();
                bins.iter().for_each(|b| t.add(b));
                t
            })
            .unwrap_or_default();

        let leaf = TreeNode::Leaf {
            value: self.leaf_value(total.g, total.h),
            n_samples: rows.len(),
        };
        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_samples_leaf.max(1) {
            return leaf;
        }
        let Some(split) = self.best_split(&hist, &total) else {
            return leaf;
        };

        let bins = &self.binned[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| (bins[r] as usize) <= split.bin);

        // Build the smaller child's histogram and derive its sibling
        let (small, large_is_left) = if left_rows.len() <= right_rows.len() {
            (&left_rows, false)
        } else {
            (&right_rows, true)
        };
        let small_hist = self.histogram(small);
        let large_hist: Histogram = hist
            .iter()
            .zip(&small_hist)
            .map(|(p, s)| p.iter().zip(s).map(|(a, b)| a.minus(b)).collect())
            .collect();
        let (left_hist, right_hist) = if large_is_left {
            (large_hist, small_hist)
        } else {
            (small_hist, large_hist)
        };

        let n_samples = rows.len();
        TreeNode::Split {
            feature_idx: split.feature,
            threshold: self.binner.threshold(split.feature, split.bin),
            left: Box::new(self.grow(left_rows, left_hist, depth + 1)),
            right: Box::new(self.grow(right_rows, right_hist, depth + 1)),
            n_samples,
            gain: split.gain,
        }
    }
}

/// Regression tree with Newton leaf values `-G / (H + lambda)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    /// Grow a tree on the given rows from gradients and hessians
    pub fn fit_newton(
        binned: &[Vec<u8>],
        binner: &FeatureBinner,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        params: &TreeParams,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(ObesityError::TrainingError("Cannot grow a tree on zero rows".to_string()));
        }
        if grad.len() != hess.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} hessians", grad.len()),
                actual: format!("{} hessians", hess.len()),
            });
        }
        let ctx = GrowContext {
            binned,
            binner,
            grad,
            hess,
            params,
        };
        let hist = ctx.histogram(rows);
        Ok(Self {
            root: ctx.grow(rows.to_vec(), hist, 0),
        })
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Multiply every leaf value by `factor`
    pub fn scale_leaves(&mut self, factor: f64) {
        fn walk(node: &mut TreeNode, factor: f64) {
            match node {
                TreeNode::Leaf { value, .. } => *value *= factor,
                TreeNode::Split { left, right, .. } => {
                    walk(left, factor);
                    walk(right, factor);
                }
            }
        }
        walk(&mut self.root, factor);
    }

    pub fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        self.root.predict(sample)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.root.predict(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binner_small_cardinality_midpoints() {
        let x = array![[1.0], [2.0], [2.0], [4.0]];
        let binner = FeatureBinner::fit(x.view(), 255).unwrap();
        assert_eq!(binner.n_bins(0), 3);
        assert_eq!(binner.threshold(0, 0), 1.5);
        let binned = binner.transform(x.view());
        assert_eq!(binned[0], vec![0, 1, 1, 2]);
    }

    #[test]
    fn test_binner_caps_bins() {
        let x = Array2::from_shape_fn((1000, 1), |(i, _)| i as f64);
        let binner = FeatureBinner::fit(x.view(), 16).unwrap();
        assert!(binner.n_bins(0) <= 16);
        let binned = binner.transform(x.view());
        assert!(binned[0].windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_invalid_max_bins() {
        let x = array![[1.0]];
        assert!(FeatureBinner::fit(x.view(), 1).is_err());
        assert!(FeatureBinner::fit(x.view(), 1000).is_err());
    }

    #[test]
    fn test_newton_tree_fits_step() {
        // squared loss: g = pred - y with pred 0, h = 1
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; 6];
        let binner = FeatureBinner::fit(x.view(), 255).unwrap();
        let binned = binner.transform(x.view());
        let rows: Vec<usize> = (0..6).collect();
        let tree = RegressionTree::fit_newton(&binned, &binner, &grad, &hess, &rows, &TreeParams::default()).unwrap();

        let pred = tree.predict(&x);
        assert!((pred[0] - 1.0).abs() < 1e-9);
        assert!((pred[5] - 5.0).abs() < 1e-9);
        assert!(tree.root().depth() <= 3);
    }

    #[test]
    fn test_depth_limit_and_scaling() {
        let x = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
        let grad: Vec<f64> = (0..32).map(|i| -(i as f64)).collect();
        let hess = vec![1.0; 32];
        let binner = FeatureBinner::fit(x.view(), 255).unwrap();
        let binned = binner.transform(x.view());
        let rows: Vec<usize> = (0..32).collect();
        let params = TreeParams {
            max_depth: 2,
            ..TreeParams::default()
        };
        let mut tree = RegressionTree::fit_newton(&binned, &binner, &grad, &hess, &rows, &params).unwrap();
        assert_eq!(tree.root().depth(), 2);
        assert_eq!(tree.root().n_leaves(), 4);

        let before = tree.predict_row(x.row(31));
        tree.scale_leaves(0.5);
        assert!((tree.predict_row(x.row(31)) - before * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_gradient_gives_single_leaf() {
        let x = array![[0.0], [1.0], [2.0]];
        let binner = FeatureBinner::fit(x.view(), 255).unwrap();
        let binned = binner.transform(x.view());
        let tree = RegressionTree::fit_newton(&binned, &binner, &[1.0; 3], &[1.0; 3], &[0, 1, 2], &TreeParams::default())
            .unwrap();
        assert_eq!(tree.root().n_leaves(), 1);
    }
}
