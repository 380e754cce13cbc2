//! Tree-accelerated evaluation against brute force.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tree_kde::{EvaluationMode, KdeConfig, KernelDensity, brute_force_log_density};

fn gaussian_cloud(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0) + rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn bench_evaluation_modes(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let samples = gaussian_cloud(&mut rng, 20_000, 3);
    let queries = gaussian_cloud(&mut rng, 2_000, 3);

    let mut group = c.benchmark_group("log_density");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(queries.len() as u64));

    let base = KdeConfig::default().with_bandwidth(0.2).with_rel_tol(1e-3);
    for mode in EvaluationMode::ALL {
        let mut kde = KernelDensity::new(base.clone().with_mode(mode)).unwrap();
        kde.train(&samples).unwrap();
        group.bench_with_input(BenchmarkId::new("tree", mode), &queries, |b, queries| {
            b.iter(|| black_box(kde.get_log_density(queries).unwrap()));
        });
    }
    group.bench_with_input(BenchmarkId::new("brute_force", "exact"), &queries, |b, queries| {
        b.iter(|| black_box(brute_force_log_density(&samples, queries, &base).unwrap()));
    });
    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(8);
    let samples = gaussian_cloud(&mut rng, 50_000, 4);

    let mut group = c.benchmark_group("train");
    group.sample_size(20);
    for mode in [EvaluationMode::KdTreeSingle, EvaluationMode::BallTreeSingle] {
        group.bench_function(BenchmarkId::from_parameter(mode), |b| {
            b.iter(|| {
                let mut kde = KernelDensity::new(KdeConfig::default().with_mode(mode)).unwrap();
                kde.train(black_box(&samples)).unwrap();
                kde
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluation_modes, bench_training);
criterion_main!(benches);
