//! One-hot encoding of categorical columns

use crate::error::{ObesityError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One-hot encoder with a sorted vocabulary per column.
///
/// Categories not seen during fit encode as an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
    offsets: Vec<usize>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `columns[j][i]` is row `i` of column `j`
    pub fn fit(&mut self, columns: &[Vec<String>]) -> Result<&mut Self> {
        self.categories = columns
            .iter()
            .map(|col| {
                let mut vocab = col.clone();
                vocab.sort();
                vocab.dedup();
                vocab
            })
            .collect();

        let mut offset = 0;
        self.offsets = self
            .categories
            .iter()
            .map(|vocab| {
                let start = offset;
                offset += vocab.len();
                start
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        if columns.len() != self.categories.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", self.categories.len()),
                actual: format!("{} columns", columns.len()),
            });
        }

        let n_rows = columns.first().map_or(0, |c| c.len());
        let mut out = Array2::zeros((n_rows, self.n_output_features()));
        for (j, col) in columns.iter().enumerate() {
            let vocab = &self.categories[j];
            for (i, value) in col.iter().enumerate() {
                if let Ok(pos) = vocab.binary_search(value) {
                    out[[i, self.offsets[j] + pos]] = 1.0;
                }
            }
        }
        Ok(out)
    }

    pub fn n_output_features(&self) -> usize {
        self.categories.iter().map(|v| v.len()).sum()
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Names in the form `column_category`
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, vocab)| vocab.iter().map(move |cat| format!("{}_{}", name, cat)))
            .collect()
    }
}
