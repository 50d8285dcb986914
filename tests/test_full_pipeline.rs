//! Integration test: sweep, refit, artifact persistence

mod common;

use obesity_stack::export::{load_metadata, load_model, save_model, ModelMetadata};
use obesity_stack::inference::{InferenceService, ServiceStatus};
use obesity_stack::optimizer::{ConfigSpace, SweepDriver, TrainingConfig};
use obesity_stack::synthetic::OversamplingStrategy;

fn small_space() -> ConfigSpace {
    ConfigSpace::new(vec![
        common::fast_candidate("sel98-k3"),
        common::fast_candidate("nosel-none")
            .with_selector(None)
            .with_oversampling(OversamplingStrategy::None),
    ])
    .unwrap()
}

#[test]
fn test_sweep_is_reproducible() {
    let dataset = common::sample_dataset(210);
    let config = TrainingConfig::new().with_stack_folds(3, 3);

    let first = SweepDriver::new(config.clone(), small_space()).sweep(&dataset).unwrap();
    let second = SweepDriver::new(config, small_space()).sweep(&dataset).unwrap();

    assert_eq!(first.trials.len(), 2);
    assert_eq!(first.best_trial_idx, second.best_trial_idx);
    for (a, b) in first.trials.iter().zip(&second.trials) {
        assert_eq!(a.mean_score(), b.mean_score());
        assert_eq!(a.cv.as_ref().map(|cv| cv.n_folds), Some(3));
    }
}

#[test]
fn test_run_and_artifact_round_trip() {
    let dataset = common::sample_dataset(210);
    let config = TrainingConfig::new().with_stack_folds(3, 3);
    let outcome = SweepDriver::new(config, small_space()).run(&dataset).unwrap();

    let n_test = (dataset.len() as f64 * 0.15).ceil() as usize;
    assert_eq!(outcome.holdout.n_samples, n_test);
    assert!((0.0..=1.0).contains(&outcome.holdout.accuracy));
    assert_eq!(outcome.best_candidate.name, outcome.sweep.best_trial().name);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.bin");
    let metadata = ModelMetadata::from_outcome("test-model", &outcome);
    save_model(&outcome.pipeline, metadata.clone(), &path).unwrap();

    let (loaded, loaded_meta) = load_model(&path).unwrap();
    assert_eq!(loaded_meta, metadata);
    assert_eq!(load_metadata(&path).unwrap().candidate.name, outcome.best_candidate.name);
    assert_eq!(loaded_meta.holdout_accuracy, Some(outcome.holdout.accuracy));
    assert_eq!(
        loaded_meta.metrics.get("holdout_macro_f1"),
        Some(&outcome.holdout.macro_avg.f1_score)
    );
    assert_eq!(loaded_meta.metrics.get("sweep_failed_candidates"), Some(&0.0));

    let records = &dataset.records()[..20];
    assert_eq!(
        loaded.predict_proba(records).unwrap(),
        outcome.pipeline.predict_proba(records).unwrap()
    );
    assert_eq!(loaded.predict(records).unwrap(), outcome.pipeline.predict(records).unwrap());
}

#[test]
fn test_corrupted_artifact_is_rejected() {
    let dataset = common::sample_dataset(140);
    let pipeline = common::fit_fast_pipeline(&dataset);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    save_model(&pipeline, ModelMetadata::for_pipeline("corrupt", &pipeline), &path).unwrap();

    // The payload sits just before the trailing 8-byte checksum
    let mut bytes = std::fs::read(&path).unwrap();
    let target = bytes.len() - 9;
    bytes[target] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();
    assert!(load_model(&path).is_err());

    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(load_model(&path).is_err());
}

#[test]
fn test_service_lifecycle() {
    let dataset = common::sample_dataset(140);
    let pipeline = common::fit_fast_pipeline(&dataset);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    save_model(&pipeline, ModelMetadata::for_pipeline("svc", &pipeline), &path).unwrap();

    let service = InferenceService::new(&path);
    assert!(matches!(service.status(), ServiceStatus::NotLoaded));
    assert!(service.predict(&common::valid_record()).is_err());

    service.load().unwrap();
    assert!(service.is_ready());
    // Loading again is a no-op
    service.load().unwrap();

    let prediction = service.predict(&common::valid_record()).unwrap();
    assert!(dataset.labels().contains(&prediction.label));
    let confidence = prediction.confidence.unwrap();
    assert!((0.0..=1.0).contains(&confidence));

    let batch = service.predict_batch(&dataset.records()[..10]).unwrap();
    assert_eq!(batch.len(), 10);
}
