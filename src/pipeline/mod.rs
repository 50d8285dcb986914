//! End-to-end model pipeline
//!
//! A [`PipelineConfig`] describes an unfitted pipeline; [`FittedPipeline::fit`]
//! runs feature engineering, the column transformer, optional selection,
//! oversampling of the training fold and the stacked ensemble.

mod config;
mod fitted;

pub use config::{CandidateConfig, PipelineConfig};
pub use fitted::{FitSummary, FittedPipeline};
pub(crate) use fitted::max_probability;

#[cfg(test)]
pub(crate) mod test_support {
    use super::CandidateConfig;
    use crate::training::{LogisticRegressionConfig, MLPConfig};

    /// A candidate small enough for unit tests
    pub fn fast_candidate(name: &str) -> CandidateConfig {
        let mut candidate = CandidateConfig::new(name)
            .with_mlp(MLPConfig::new().with_hidden_layers(vec![16]).with_max_iter(40))
            .with_boosting(15, 0.1);
        candidate.logistic = LogisticRegressionConfig::new().with_c(2.0).with_max_iter(300);
        candidate.meta = LogisticRegressionConfig::new().with_c(3.0).with_max_iter(300);
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::fast_candidate;
    use super::*;
    use crate::dataset::{generate_sample_dataset, CellValue, KNOWN_LABELS};
    use crate::synthetic::OversamplingStrategy;

    fn fit_small(candidate: CandidateConfig) -> (crate::dataset::Dataset, FittedPipeline) {
        let ds = generate_sample_dataset(140, 3).unwrap();
        let config = PipelineConfig::new(candidate).with_stack_folds(3);
        let fitted = FittedPipeline::fit(&ds, &config).unwrap();
        (ds, fitted)
    }

    #[test]
    fn test_fit_predict_shapes() {
        let (ds, fitted) = fit_small(fast_candidate("small"));
        let predictions = fitted.predict(ds.records()).unwrap();
        assert_eq!(predictions.len(), ds.len());
        assert!(predictions.iter().all(|p| KNOWN_LABELS.contains(&p.as_str())));

        let proba = fitted.predict_proba(&ds.records()[..5]).unwrap();
        assert_eq!(proba.dim(), (5, 7));
    }

    #[test]
    fn test_oversampling_only_inside_fit() {
        let (ds, fitted) = fit_small(fast_candidate("smote"));
        assert_eq!(fitted.summary().oversampler, "smote");
        assert!(!fitted.summary().n_synthetic.is_empty());
        assert_eq!(fitted.transform(ds.records()).unwrap().nrows(), ds.len());
    }

    #[test]
    fn test_predict_one_confidence_is_max_proba() {
        let (ds, fitted) = fit_small(fast_candidate("conf"));
        let record = &ds.records()[0];
        let (label, confidence) = fitted.predict_one(record).unwrap();
        let proba = fitted.predict_proba(std::slice::from_ref(record)).unwrap();
        let max = proba.row(0).iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((confidence - max).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&confidence));
        assert!(fitted.classes().contains(&label));
    }

    #[test]
    fn test_unseen_category_still_predicts() {
        let (ds, fitted) = fit_small(fast_candidate("unseen"));
        let mut record = ds.records()[0].clone();
        record.insert("MTRANS", CellValue::Text("Hoverboard".to_string()));
        assert!(fitted.predict_one(&record).is_ok());
    }

    #[test]
    fn test_without_selector_or_oversampling() {
        let candidate = fast_candidate("plain")
            .with_selector(None)
            .with_oversampling(OversamplingStrategy::None);
        let (_, fitted) = fit_small(candidate);
        assert_eq!(fitted.summary().oversampler, "none");
        assert_eq!(fitted.summary().n_features_selected, fitted.summary().n_features_transformed);
        assert_eq!(fitted.feature_names().len(), fitted.summary().n_features_selected);
    }

    #[test]
    fn test_selector_drops_features() {
        let (_, fitted) = fit_small(fast_candidate("select").with_selector(Some(50.0)));
        let summary = fitted.summary();
        assert_eq!(summary.n_features_selected, summary.n_features_transformed * 50 / 100);
    }
}
