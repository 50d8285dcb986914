//! Feature scaling implementations

use crate::error::{ObesityError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean or min
    scale: f64,  // std or range
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<&mut Self> {
        self.params = x.axis_iter(Axis(1)).map(|col| self.compute_params(col.to_vec())).collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        let mut out = x.to_owned();
        for (mut col, params) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            col.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn check_input(&self, x: ArrayView2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }

    fn compute_params(&self, values: Vec<f64>) -> ScalerParams {
        let n = values.len().max(1) as f64;
        match self.scaler_type {
            ScalerType::Standard => {
                let mean = values.iter().sum::<f64>() / n;
                // Population standard deviation
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: if min.is_finite() { min } else { 0.0 },
                    scale: if range == 0.0 || !range.is_finite() { 1.0 } else { range },
                }
            }
            ScalerType::None => ScalerParams { center: 0.0, scale: 1.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let mut scaler = Scaler::new(ScalerType::Standard);
        let out = scaler.fit_transform(x.view()).unwrap();
        let mean: f64 = out.column(0).sum() / 5.0;
        assert!(mean.abs() < 1e-10);
        // population std of 1..5 is sqrt(2)
        assert!((out[[4, 0]] - 2.0 / 2f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_scale_one() {
        let x = array![[7.0], [7.0], [7.0]];
        let mut scaler = Scaler::new(ScalerType::Standard);
        let out = scaler.fit_transform(x.view()).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[0.0], [5.0], [10.0]];
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let out = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }
}
