//! Criterion benchmarks for forward simulation.
//!
//! Benchmarks `Simulator::run` for every model at daily and sub-daily tau,
//! the inner loop of every estimation trial.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ep_core::model::{ModelKind, Tau};
use ep_core::simulation::Simulator;

fn bench_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");

    for &model in ModelKind::ALL {
        let example = model.example();
        let params = model
            .params_from_map(&example.params)
            .expect("example params are valid");
        for minutes in [1440, 360] {
            let tau = Tau::new(minutes).expect("valid tau");
            let mut sim = Simulator::new(model, example.population, tau).expect("simulator");
            group.bench_with_input(
                BenchmarkId::new(model.name(), format!("tau{minutes}_180d")),
                &example.initial,
                |b, initial| {
                    b.iter(|| {
                        let traj = sim
                            .run(black_box(initial), black_box(&params), 180)
                            .expect("simulation should not diverge");
                        black_box(traj);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_models);
criterion_main!(benches);
