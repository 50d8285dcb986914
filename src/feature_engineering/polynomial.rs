//! Degree-2 polynomial feature expansion

use crate::error::{ObesityError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Degree-2 polynomial expansion without a bias column.
///
/// Output order: the original features `x0..x{n-1}`, then `xi * xj` for
/// every `i <= j` in lexicographic order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    n_features_in: Option<usize>,
    pairs: Vec<(usize, usize)>,
}

impl PolynomialFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the input width and product ordering
    pub fn fit(&mut self, n_features: usize) -> &mut Self {
        let mut pairs = Vec::with_capacity(n_features * (n_features + 1) / 2);
        for i in 0..n_features {
            for j in i..n_features {
                pairs.push((i, j));
            }
        }
        self.pairs = pairs;
        self.n_features_in = Some(n_features);
        self
    }

    pub fn n_output_features(&self) -> usize {
        self.n_features_in.unwrap_or(0) + self.pairs.len()
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let n_in = self.n_features_in.ok_or(ObesityError::ModelNotFitted)?;
        if x.ncols() != n_in {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", n_in),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), self.n_output_features()));
        for (row_in, mut row_out) in x.rows().into_iter().zip(out.rows_mut()) {
            for j in 0..n_in {
                row_out[j] = row_in[j];
            }
            for (k, &(a, b)) in self.pairs.iter().enumerate() {
                row_out[n_in + k] = row_in[a] * row_in[b];
            }
        }
        Ok(out)
    }

    /// Output names in the form `a`, `a^2`, `a b`
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        let mut names: Vec<String> = input_names.to_vec();
        for &(a, b) in &self.pairs {
            if a == b {
                names.push(format!("{}^2", input_names[a]));
            } else {
                names.push(format!("{} {}", input_names[a], input_names[b]));
            }
        }
        names
    }
}
