//! Classifier trait and shared helpers

use crate::error::{ObesityError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Trait for multiclass probabilistic classifiers
pub trait Classifier: Send + Sync {
    /// Fit on features `x` and class indices `y` in `0..n_classes`
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()>;

    /// Class probabilities, one row per sample, rows sum to 1
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Most probable class per sample
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(argmax_rows(self.predict_proba(x)?.view()))
    }

    fn is_fitted(&self) -> bool;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Index of the largest value in each row; ties go to the lower index
pub fn argmax_rows(p: ArrayView2<f64>) -> Array1<usize> {
    p.axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

/// Row-wise softmax, numerically stabilised by the row max
pub fn softmax_inplace(z: &mut Array2<f64>) {
    for mut row in z.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
}

/// One-hot matrix of class indices
pub fn one_hot(y: &Array1<usize>, n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((y.len(), n_classes));
    for (i, &c) in y.iter().enumerate() {
        out[[i, c]] = 1.0;
    }
    out
}

/// Rows of `x` at `indices`
pub fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

/// Common argument checks for `fit`
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ObesityError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(ObesityError::TrainingError("Empty training set".to_string()));
    }
    if n_classes < 2 {
        return Err(ObesityError::TrainingError(format!(
            "Need at least 2 classes, got {}",
            n_classes
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(ObesityError::TrainingError(format!(
            "Class index {} out of range for {} classes",
            bad, n_classes
        )));
    }
    Ok(())
}

/// Common argument check for `predict_proba`
pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ObesityError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_ties_lower_index() {
        let p = array![[0.2, 0.5, 0.3], [0.4, 0.4, 0.2]];
        assert_eq!(argmax_rows(p.view()).to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut z = array![[1000.0, 1000.0], [0.0, 1.0]];
        softmax_inplace(&mut z);
        assert!((z[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((z.row(1).sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_one_hot() {
        let y = array![2, 0];
        assert_eq!(one_hot(&y, 3), array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_check_fit_input() {
        let x = array![[1.0], [2.0]];
        assert!(check_fit_input(&x, &array![0, 1], 2).is_ok());
        assert!(check_fit_input(&x, &array![0], 2).is_err());
        assert!(check_fit_input(&x, &array![0, 2], 2).is_err());
    }
}
