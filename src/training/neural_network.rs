//! Neural Network (Multi-Layer Perceptron) classifier
//!
//! A feedforward network with softmax output trained by minibatch Adam.
//! Early stopping holds out a stratified slice of the training data and
//! restores the weights with the best validation accuracy.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::error::{ObesityError, Result};
use crate::training::cross_validation::stratified_train_test_split;
use crate::training::metrics::accuracy;
use crate::training::models::{
    argmax_rows, check_fit_input, check_predict_input, gather_rows, one_hot, softmax_inplace, Classifier,
};

/// Activation function for hidden layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    ReLU,
    /// Sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::ReLU
    }
}

impl Activation {
    fn apply(&self, z: &mut Array2<f64>) {
        match self {
            Activation::ReLU => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Tanh => z.mapv_inplace(f64::tanh),
        }
    }

    /// Derivative expressed through the activation output
    fn derivative(&self, a: f64) -> f64 {
        match self {
            Activation::ReLU => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Tanh => 1.0 - a * a,
        }
    }
}

/// Neural Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MLPConfig {
    /// Hidden layer sizes
    pub hidden_layers: Vec<usize>,
    /// Activation function for hidden layers
    pub activation: Activation,
    /// Adam step size
    pub learning_rate: f64,
    /// Maximum number of epochs
    pub max_iter: usize,
    /// Minibatch size; `None` uses `min(200, n_samples)`
    pub batch_size: Option<usize>,
    /// L2 regularization
    pub alpha: f64,
    /// Random seed
    pub random_state: u64,
    /// Hold out a validation slice and stop when it stops improving
    pub early_stopping: bool,
    /// Fraction of training data held out for early stopping
    pub validation_fraction: f64,
    /// Epochs without improvement before stopping
    pub n_iter_no_change: usize,
    /// Minimum improvement of validation accuracy
    pub tol: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100],
            activation: Activation::ReLU,
            learning_rate: 1e-3,
            max_iter: 1200,
            batch_size: None,
            alpha: 5e-4,
            random_state: 42,
            early_stopping: true,
            validation_fraction: 0.1,
            n_iter_no_change: 20,
            tol: 1e-4,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl MLPConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.hidden_layers = layers;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_early_stopping(mut self, enabled: bool) -> Self {
        self.early_stopping = enabled;
        self
    }
}

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct AdamState<D: ndarray::Dimension> {
    m: ndarray::Array<f64, D>,
    v: ndarray::Array<f64, D>,
}

impl<D: ndarray::Dimension> AdamState<D> {
    fn zeros_like(p: &ndarray::Array<f64, D>) -> Self {
        Self {
            m: ndarray::Array::zeros(p.raw_dim()),
            v: ndarray::Array::zeros(p.raw_dim()),
        }
    }

    fn step(
        &mut self,
        param: &mut ndarray::Array<f64, D>,
        grad: &ndarray::Array<f64, D>,
        lr_t: f64,
        config: &MLPConfig,
    ) {
        let (b1, b2, eps) = (config.beta_1, config.beta_2, config.epsilon);
        Zip::from(param)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + eps);
            });
    }
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    n_classes: usize,
    n_epochs: usize,
    is_fitted: bool,
}

impl MLPClassifier {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            n_classes: 0,
            n_epochs: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    /// Epochs run by the last fit
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// Glorot-uniform initialisation
    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(self.n_classes);

        let factor = if self.config.activation == Activation::Sigmoid { 2.0 } else { 6.0 };
        for pair in layer_sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (factor / (fan_in + fan_out) as f64).sqrt();
            let w = Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound));
            let b = Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound));
            self.weights.push(w);
            self.biases.push(b);
        }
    }

    /// Layer outputs; the last entry holds class probabilities
    fn forward(&self, x: &Array2<f64>) -> Vec<Array2<f64>> {
        let n_layers = self.weights.len();
        let mut activations: Vec<Array2<f64>> = Vec::with_capacity(n_layers);
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let input = if i == 0 { x } else { &activations[i - 1] };
            let mut z = input.dot(w) + b;
            if i + 1 == n_layers {
                softmax_inplace(&mut z);
            } else {
                self.config.activation.apply(&mut z);
            }
            activations.push(z);
        }
        activations
    }

    /// Gradients of the penalised cross-entropy for one minibatch
    fn backward(
        &self,
        x: &Array2<f64>,
        targets: &Array2<f64>,
        activations: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let batch = x.nrows() as f64;
        let n_layers = self.weights.len();
        let mut grads = Vec::with_capacity(n_layers);

        let mut delta = (&activations[n_layers - 1] - targets) / batch;
        for layer in (0..n_layers).rev() {
            let input = if layer == 0 { x } else { &activations[layer - 1] };
            let grad_w = input.t().dot(&delta) + &self.weights[layer] * (self.config.alpha / batch);
            let grad_b = delta.sum_axis(Axis(0));

            if layer > 0 {
                let mut next = delta.dot(&self.weights[layer].t());
                let act = self.config.activation;
                Zip::from(&mut next)
                    .and(&activations[layer - 1])
                    .for_each(|d, &a| *d *= act.derivative(a));
                delta = next;
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        grads
    }

    fn validation_split(&self, y: &Array1<usize>) -> Result<(Vec<usize>, Vec<usize>)> {
        let all: Vec<usize> = (0..y.len()).collect();
        if !self.config.early_stopping {
            return Ok((all, Vec::new()));
        }
        let (train, val) = stratified_train_test_split(y, self.config.validation_fraction, self.config.random_state)?;
        if val.is_empty() || train.is_empty() {
            return Ok((all, Vec::new()));
        }
        Ok((train, val))
    }
}

impl Classifier for MLPClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        check_fit_input(x, y, n_classes)?;
        if self.config.hidden_layers.iter().any(|&h| h == 0) {
            return Err(ObesityError::InvalidParameter {
                name: "hidden_layers".to_string(),
                value: format!("{:?}", self.config.hidden_layers),
                reason: "layer sizes must be positive".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.initialize_weights(&mut rng);

        let (train_idx, val_idx) = self.validation_split(y)?;
        let x_train = gather_rows(x, &train_idx);
        let t_train = one_hot(&y.select(Axis(0), &train_idx), n_classes);
        let x_val = gather_rows(x, &val_idx);
        let y_val = y.select(Axis(0), &val_idx);

        let n_train = x_train.nrows();
        let batch_size = self.config.batch_size.unwrap_or(200).clamp(1, n_train);

        let mut adam_w: Vec<AdamState<ndarray::Ix2>> = self.weights.iter().map(AdamState::zeros_like).collect();
        let mut adam_b: Vec<AdamState<ndarray::Ix1>> = self.biases.iter().map(AdamState::zeros_like).collect();
        let mut t = 0i32;

        let mut best_score = f64::NEG_INFINITY;
        let mut best_params: Option<(Vec<Array2<f64>>, Vec<Array1<f64>>)> = None;
        let mut no_improvement = 0;
        let mut indices: Vec<usize> = (0..n_train).collect();

        self.n_epochs = 0;
        for epoch in 0..self.config.max_iter {
            indices.shuffle(&mut rng);

            for batch in indices.chunks(batch_size) {
                let xb = gather_rows(&x_train, batch);
                let tb = gather_rows(&t_train, batch);
                let activations = self.forward(&xb);
                let grads = self.backward(&xb, &tb, &activations);

                t += 1;
                let lr_t = self.config.learning_rate * (1.0 - self.config.beta_2.powi(t)).sqrt()
                    / (1.0 - self.config.beta_1.powi(t));
                for (layer, (gw, gb)) in grads.into_iter().enumerate() {
                    adam_w[layer].step(&mut self.weights[layer], &gw, lr_t, &self.config);
                    adam_b[layer].step(&mut self.biases[layer], &gb, lr_t, &self.config);
                }
            }
            self.n_epochs = epoch + 1;

            if self.weights.iter().any(|w| w.iter().any(|v| !v.is_finite())) {
                return Err(ObesityError::TrainingError("MLP weights diverged".to_string()));
            }

            if !val_idx.is_empty() {
                let probs = self.forward(&x_val).pop().unwrap_or_default();
                let score = accuracy(&y_val, &argmax_rows(probs.view()));
                if score > best_score + self.config.tol {
                    best_score = score;
                    best_params = Some((self.weights.clone(), self.biases.clone()));
                    no_improvement = 0;
                } else {
                    no_improvement += 1;
                    if no_improvement >= self.config.n_iter_no_change {
                        tracing::debug!(epoch = epoch + 1, best_score, "MLP early stopping");
                        break;
                    }
                }
            }
        }

        if self.n_epochs == self.config.max_iter {
            tracing::debug!(max_iter = self.config.max_iter, "MLP reached max_iter");
        }
        if let Some((w, b)) = best_params {
            self.weights = w;
            self.biases = b;
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        self.forward(x)
            .pop()
            .ok_or_else(|| ObesityError::InferenceError("MLP has no layers".to_string()))
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn name(&self) -> &'static str {
        "mlp"
    }
}
