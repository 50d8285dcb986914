//! Multinomial logistic regression

use crate::error::{ObesityError, Result};
use crate::training::models::{check_fit_input, check_predict_input, one_hot, softmax_inplace, Classifier};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Configuration for [`LogisticRegression`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticRegressionConfig {
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Maximum gradient steps
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this
    pub tol: f64,
    /// Step size; `None` derives a safe step from the data
    pub learning_rate: Option<f64>,
    /// Nesterov momentum
    pub momentum: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            learning_rate: None,
            momentum: 0.9,
        }
    }
}

impl LogisticRegressionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }
}

/// Softmax (multinomial) logistic regression trained by full-batch
/// accelerated gradient descent on the L2-penalised cross-entropy
/// `sum(CE) + ||W||^2 / (2C)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    /// Fitted coefficients, `(n_features, n_classes)`
    coefficients: Option<Array2<f64>>,
    /// Fitted intercepts, one per class
    intercept: Option<Array1<f64>>,
    n_iter: usize,
    converged: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticRegressionConfig::default())
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new(config: LogisticRegressionConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: None,
            n_iter: 0,
            converged: false,
        }
    }

    pub fn config(&self) -> &LogisticRegressionConfig {
        &self.config
    }

    /// Iterations used by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coefficients.as_ref()
    }

    fn logits(x: &Array2<f64>, w: &Array2<f64>, b: &Array1<f64>) -> Array2<f64> {
        x.dot(w) + b
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        check_fit_input(x, y, n_classes)?;
        if self.config.c <= 0.0 {
            return Err(ObesityError::InvalidParameter {
                name: "C".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n = x.nrows() as f64;
        let n_features = x.ncols();
        let targets = one_hot(y, n_classes);
        let l2 = 1.0 / (self.config.c * n);

        // Softmax curvature is bounded by half the largest eigenvalue of
        // X'X/n, itself bounded by the squared Frobenius norm
        let lr = self.config.learning_rate.unwrap_or_else(|| {
            let frob = x.iter().map(|v| v * v).sum::<f64>() / n;
            1.0 / (0.5 * (frob + 1.0) + l2)
        });

        let mut w = Array2::<f64>::zeros((n_features, n_classes));
        let mut b = Array1::<f64>::zeros(n_classes);
        let mut w_prev = w.clone();
        let mut b_prev = b.clone();

        self.converged = false;
        self.n_iter = self.config.max_iter;
        for iter in 0..self.config.max_iter {
            // Nesterov look-ahead point
            let mu = self.config.momentum * iter as f64 / (iter as f64 + 3.0);
            let w_look = &w + &((&w - &w_prev) * mu);
            let b_look = &b + &((&b - &b_prev) * mu);

            let mut p = Self::logits(x, &w_look, &b_look);
            softmax_inplace(&mut p);
            let err = p - &targets;

            let grad_w = x.t().dot(&err) / n + &w_look * l2;
            let grad_b = err.sum_axis(Axis(0)) / n;

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |m, g| m.max(g.abs()));

            w_prev = w;
            b_prev = b;
            w = w_look - grad_w * lr;
            b = b_look - grad_b * lr;

            if !max_grad.is_finite() {
                return Err(ObesityError::TrainingError(
                    "Logistic regression diverged".to_string(),
                ));
            }
            if max_grad < self.config.tol {
                self.converged = true;
                self.n_iter = iter + 1;
                break;
            }
        }

        if !self.converged {
            tracing::debug!(max_iter = self.config.max_iter, "Logistic regression hit max_iter before converging");
        }

        self.coefficients = Some(w);
        self.intercept = Some(b);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(w), Some(b)) = (&self.coefficients, &self.intercept) else {
            return Err(ObesityError::ModelNotFitted);
        };
        check_predict_input(x, w.nrows())?;
        let mut p = Self::logits(x, w, b);
        softmax_inplace(&mut p);
        Ok(p)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn name(&self) -> &'static str {
        "logistic_regression"
    }
}
