//! Model training module
//!
//! Provides the learners used by the stacked ensemble:
//! - Multi-layer perceptron trained with Adam and early stopping
//! - Multinomial logistic regression
//! - Multiclass gradient boosted histogram trees
//!
//! plus stratified cross-validation and classification metrics.

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod metrics;
pub mod neural_network;

pub use cross_validation::{stratified_train_test_split, CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{FeatureBinner, RegressionTree, TreeNode, TreeParams};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::{LogisticRegression, LogisticRegressionConfig};
pub use metrics::{accuracy, confusion_matrix, ClassificationReport, ClassMetrics};
pub use models::{argmax_rows, gather_rows, Classifier};
pub use neural_network::{Activation, MLPClassifier, MLPConfig};
