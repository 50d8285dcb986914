//! Ensemble methods module
//!
//! Stacked generalisation: base learners produce out-of-fold class
//! probabilities that train a logistic meta-learner.

mod stacking;

pub use stacking::{BaseLearner, StackingClassifier, StackingConfig};
