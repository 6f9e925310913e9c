//! Criterion benchmarks for parameter estimation.
//!
//! Benchmarks a single-phase fit at a small trial budget and the
//! differential evolution core on its own.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ep_config::EstimationConfig;
use ep_core::estimation::{DeSettings, DifferentialEvolution, Estimator};
use ep_core::model::{ModelKind, ParamMap, Tau};
use ep_core::ExampleData;
use std::time::Duration;

fn bench_single_phase_fit(c: &mut Criterion) {
    let records = ExampleData::default()
        .generate(ModelKind::Sir, 30, &ParamMap::new())
        .expect("example records");
    let estimator = Estimator::new(EstimationConfig {
        trial_budget: 500,
        workers: 2,
        seed: 7,
        ..EstimationConfig::default()
    })
    .expect("estimator");

    c.bench_function("estimate/sir_30d_500_trials", |b| {
        b.iter(|| {
            let estimate = estimator
                .estimate(
                    ModelKind::Sir,
                    black_box(records.records()),
                    records.population(),
                    Tau::DAY,
                )
                .expect("fit");
            black_box(estimate);
        });
    });
}

fn bench_de_sphere(c: &mut Criterion) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("pool");
    let de = DifferentialEvolution::new(DeSettings {
        population: 20,
        mutation: 0.7,
        crossover: 0.9,
        trial_budget: 2_000,
        timeout: Duration::from_secs(60),
        patience: usize::MAX,
        tolerance: 0.0,
        seed: 1,
    });
    let bounds = vec![(0.0, 1.0); 4];

    c.bench_function("estimate/de_sphere_2000_trials", |b| {
        b.iter(|| {
            let outcome = de.minimize(&pool, &bounds, |x| {
                x.iter().map(|v| (v - 0.3).powi(2)).sum::<f64>()
            });
            black_box(outcome);
        });
    });
}

criterion_group!(benches, bench_single_phase_fit, bench_de_sphere);
criterion_main!(benches);
