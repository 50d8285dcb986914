//! Integration tests for base learners, stacking and oversampling

mod common;

use ndarray::{Array1, Array2, Axis};
use obesity_stack::dataset::LabelEncoder;
use obesity_stack::ensemble::{BaseLearner, StackingClassifier, StackingConfig};
use obesity_stack::feature_engineering::FeatureEngineer;
use obesity_stack::preprocessing::DataPreprocessor;
use obesity_stack::synthetic::{class_counts, OversamplingStrategy};
use obesity_stack::training::{
    accuracy, ClassificationReport, Classifier, CVStrategy, CrossValidator, GradientBoostingClassifier,
    GradientBoostingConfig, LogisticRegression, LogisticRegressionConfig, MLPClassifier, MLPConfig,
};

fn design_matrix(n: usize) -> (Array2<f64>, Array1<usize>, LabelEncoder) {
    let dataset = FeatureEngineer::new().transform_dataset(&common::sample_dataset(n));
    let x = DataPreprocessor::new().fit_transform(&dataset).unwrap();
    let labels = LabelEncoder::fit(dataset.labels()).unwrap();
    let y = labels.encode(dataset.labels()).unwrap();
    (x, y, labels)
}

fn assert_rows_sum_to_one(proba: &Array2<f64>) {
    for row in proba.axis_iter(Axis(0)) {
        assert!((row.sum() - 1.0).abs() < 1e-9);
        assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}

// ============================================================================
// Base learners
// ============================================================================

#[test]
fn test_base_learners_beat_chance() {
    let (x, y, labels) = design_matrix(280);
    let k = labels.n_classes();

    let mut learners: Vec<Box<dyn Classifier>> = vec![
        Box::new(LogisticRegression::new(LogisticRegressionConfig::new().with_max_iter(500))),
        Box::new(MLPClassifier::new(MLPConfig::new().with_hidden_layers(vec![32]).with_max_iter(80))),
        Box::new(GradientBoostingClassifier::new(
            GradientBoostingConfig::new().with_n_estimators(30).with_learning_rate(0.1),
        )),
    ];

    for learner in learners.iter_mut() {
        learner.fit(&x, &y, k).unwrap();
        let proba = learner.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (x.nrows(), k));
        assert_rows_sum_to_one(&proba);

        let acc = accuracy(&y, &learner.predict(&x).unwrap());
        assert!(acc > 2.0 / k as f64, "{} training accuracy {}", learner.name(), acc);
    }
}

#[test]
fn test_mlp_is_seeded() {
    let (x, y, labels) = design_matrix(140);
    let config = MLPConfig::new().with_hidden_layers(vec![16]).with_max_iter(20).with_random_state(7);

    let mut a = MLPClassifier::new(config.clone());
    let mut b = MLPClassifier::new(config);
    a.fit(&x, &y, labels.n_classes()).unwrap();
    b.fit(&x, &y, labels.n_classes()).unwrap();
    assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
}

// ============================================================================
// Stacking
// ============================================================================

#[test]
fn test_stacking_end_to_end() {
    let (x, y, labels) = design_matrix(210);
    let k = labels.n_classes();

    let base = vec![
        BaseLearner::Mlp(MLPClassifier::new(MLPConfig::new().with_hidden_layers(vec![16]).with_max_iter(40))),
        BaseLearner::Logistic(LogisticRegression::new(LogisticRegressionConfig::new().with_max_iter(300))),
        BaseLearner::GradientBoosting(GradientBoostingClassifier::new(
            GradientBoostingConfig::new().with_n_estimators(15).with_learning_rate(0.1),
        )),
    ];
    let meta = LogisticRegression::new(LogisticRegressionConfig::new().with_c(3.0).with_max_iter(300));
    let mut stack = StackingClassifier::new(StackingConfig::default().with_n_folds(3), base, meta);

    stack.fit(&x, &y, k).unwrap();
    let proba = stack.predict_proba(&x).unwrap();
    assert_eq!(proba.dim(), (x.nrows(), k));
    assert_rows_sum_to_one(&proba);

    let report = ClassificationReport::compute(&y, &stack.predict(&x).unwrap(), labels.classes()).unwrap();
    assert_eq!(report.n_samples, x.nrows());
    assert_eq!(report.per_class.len(), k);
    assert!(report.accuracy > 0.5);
}

// ============================================================================
// Cross-validation and oversampling
// ============================================================================

#[test]
fn test_stratified_folds_cover_every_row_once() {
    let (_, y, _) = design_matrix(140);
    let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true }).with_random_state(42);
    let splits = cv.split(y.len(), Some(&y)).unwrap();
    assert_eq!(splits.len(), 3);

    let mut seen = vec![0usize; y.len()];
    for split in &splits {
        for &i in &split.test_indices {
            seen[i] += 1;
        }
        assert_eq!(split.train_indices.len() + split.test_indices.len(), y.len());
    }
    assert!(seen.iter().all(|&c| c == 1));

    let again = cv.split(y.len(), Some(&y)).unwrap();
    assert_eq!(splits[0].test_indices, again[0].test_indices);
}

#[test]
fn test_smote_balances_classes() {
    let (x, y, _) = design_matrix(210);
    let before = class_counts(&y);
    let majority = before.values().copied().max().unwrap();

    let mut sampler = OversamplingStrategy::Smote { k_neighbors: 3 }.resolve(42);
    let result = sampler.fit_resample(&x, &y).unwrap();

    let after = class_counts(&result.y);
    assert!(after.values().all(|&c| c == majority));
    assert_eq!(result.x.nrows(), result.y.len());
    assert_eq!(result.x.nrows(), x.nrows() + result.total_synthetic());

    // Original rows come first, unchanged
    assert_eq!(result.x.slice(ndarray::s![..x.nrows(), ..]), x);
}

#[test]
fn test_disabled_oversampling_is_identity() {
    let (x, y, _) = design_matrix(140);
    let mut sampler = OversamplingStrategy::None.resolve(42);
    let result = sampler.fit_resample(&x, &y).unwrap();
    assert_eq!(result.x, x);
    assert_eq!(result.y, y);
    assert_eq!(result.total_synthetic(), 0);
}
