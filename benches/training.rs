use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use obesity_stack::dataset::generate_sample_dataset;
use obesity_stack::pipeline::{CandidateConfig, FittedPipeline, PipelineConfig};
use obesity_stack::training::{LogisticRegressionConfig, MLPConfig};

fn bench_candidate() -> CandidateConfig {
    let mut candidate = CandidateConfig::new("bench")
        .with_mlp(MLPConfig::new().with_hidden_layers(vec![32]).with_max_iter(50))
        .with_boosting(30, 0.1);
    candidate.logistic = LogisticRegressionConfig::new().with_max_iter(500);
    candidate.meta = LogisticRegressionConfig::new().with_c(3.0).with_max_iter(500);
    candidate
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_fit");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [200, 500].iter() {
        let dataset = generate_sample_dataset(*n_rows, 42).unwrap();
        let config = PipelineConfig::new(bench_candidate()).with_stack_folds(3);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &dataset, |b, ds| {
            b.iter(|| FittedPipeline::fit(black_box(ds), &config).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let dataset = generate_sample_dataset(500, 42).unwrap();
    let config = PipelineConfig::new(bench_candidate()).with_stack_folds(3);
    let pipeline = FittedPipeline::fit(&dataset, &config).unwrap();

    group.bench_function("predict_one", |b| {
        let record = &dataset.records()[0];
        b.iter(|| pipeline.predict_one(black_box(record)).unwrap())
    });

    for batch in [10, 100].iter() {
        let records = &dataset.records()[..*batch];
        group.bench_with_input(BenchmarkId::new("predict_batch", batch), records, |b, r| {
            b.iter(|| pipeline.predict_proba(black_box(r)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_prediction);
criterion_main!(benches);
