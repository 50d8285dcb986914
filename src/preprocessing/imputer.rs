//! Missing value imputation strategies

use crate::error::{ObesityError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value
    MostFrequent,
    /// Replace with a constant value
    Constant(f64),
}

/// Column-wise imputer for numeric matrices; NaN marks a missing cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<f64>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<&mut Self> {
        self.fill_values = x
            .axis_iter(Axis(1))
            .map(|col| {
                let present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                self.compute_fill_value(present)
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace NaN cells with the fitted fill values
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        if x.ncols() != self.fill_values.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", self.fill_values.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        for (mut col, &fill) in out.axis_iter_mut(Axis(1)).zip(&self.fill_values) {
            col.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn fill_values(&self) -> &[f64] {
        &self.fill_values
    }

    fn compute_fill_value(&self, mut values: Vec<f64>) -> f64 {
        // Columns with no observed value fall back to zero
        if values.is_empty() {
            return 0.0;
        }
        match &self.strategy {
            ImputeStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            ImputeStrategy::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            ImputeStrategy::MostFrequent => {
                let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
                for v in values {
                    counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
                }
                let mut best: Option<(f64, usize)> = None;
                for &(v, c) in counts.values() {
                    match best {
                        Some((bv, bc)) if c < bc || (c == bc && v >= bv) => {}
                        _ => best = Some((v, c)),
                    }
                }
                best.map(|(v, _)| v).unwrap_or(0.0)
            }
            ImputeStrategy::Constant(c) => *c,
        }
    }
}

/// Most-frequent imputer for string columns.
///
/// Ties between equally frequent values resolve to the lexicographically
/// smallest one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalImputer {
    fill_values: Vec<String>,
    is_fitted: bool,
}

/// Fill value for a categorical column that was never observed
pub const MISSING_CATEGORY: &str = "missing";

impl CategoricalImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `columns[j][i]` is row `i` of column `j`
    pub fn fit(&mut self, columns: &[Vec<Option<String>>]) -> Result<&mut Self> {
        self.fill_values = columns.iter().map(|col| most_frequent(col)).collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, columns: &[Vec<Option<String>>]) -> Result<Vec<Vec<String>>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        if columns.len() != self.fill_values.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", self.fill_values.len()),
                actual: format!("{} columns", columns.len()),
            });
        }
        Ok(columns
            .iter()
            .zip(&self.fill_values)
            .map(|(col, fill)| {
                col.iter()
                    .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
                    .collect()
            })
            .collect())
    }

    pub fn fill_values(&self) -> &[String] {
        &self.fill_values
    }
}

fn most_frequent(values: &[Option<String>]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (v, c) in counts {
        if best.map_or(true, |(_, bc)| c > bc) {
            best = Some((v, c));
        }
    }
    best.map(|(v, _)| v.to_string())
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_imputation() {
        let x = array![[1.0, 10.0], [f64::NAN, 20.0], [3.0, f64::NAN], [4.0, 40.0]];
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        let out = imputer.fit_transform(x.view()).unwrap();
        assert_eq!(out[[1, 0]], 3.0);
        assert_eq!(out[[2, 1]], 20.0);
        assert_eq!(out[[0, 0]], 1.0);
    }

    #[test]
    fn test_mean_imputation() {
        let x = array![[1.0], [f64::NAN], [3.0]];
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let out = imputer.fit_transform(x.view()).unwrap();
        assert_eq!(out[[1, 0]], 2.0);
    }

    #[test]
    fn test_all_missing_column() {
        let x = array![[f64::NAN], [f64::NAN]];
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        let out = imputer.fit_transform(x.view()).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_unfitted() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.transform(array![[1.0]].view()),
            Err(ObesityError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_most_frequent_tie_breaks_lexicographically() {
        let col = vec![
            Some("b".to_string()),
            Some("a".to_string()),
            None,
            Some("b".to_string()),
            Some("a".to_string()),
        ];
        let mut imputer = CategoricalImputer::new();
        imputer.fit(&[col.clone()]).unwrap();
        assert_eq!(imputer.fill_values(), &["a".to_string()]);
        let out = imputer.transform(&[col]).unwrap();
        assert_eq!(out[0][2], "a");
    }
}
