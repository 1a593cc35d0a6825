//! LP dispatch benchmarks
//!
//! ```bash
//! cargo bench --bench dispatch
//! ```

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use site_dispatch::domain::{GeneratorSpec, Horizon, Network, StorageSpec};
use site_dispatch::optimizer::{DispatchModel, DispatchStrategy, LpDispatch, ModelOptions};

fn network(hours: usize, batteries: usize) -> Network {
    let horizon = Horizon::hourly(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(), hours);
    let load = (0..hours)
        .map(|h| 400.0 + 300.0 * ((h % 24) as f64 / 24.0 * std::f64::consts::PI).sin())
        .collect();
    let prices: Vec<f64> = (0..hours)
        .map(|h| if (16..18).contains(&(h % 24)) { 0.06 } else { 0.015 })
        .collect();
    Network::new(horizon, load)
        .with_generator(GeneratorSpec::grid(5000.0, prices))
        .with_storages((1..=batteries).map(|i| {
            StorageSpec::new(format!("battery{i}"), 1000.0)
                .with_window(0.2, 0.8)
                .with_efficiency(0.9, 0.9)
                .with_standing_loss(0.001)
        }))
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_model");
    for hours in [24, 168] {
        let network = network(hours, 6);
        group.bench_with_input(BenchmarkId::from_parameter(hours), &network, |b, network| {
            b.iter(|| DispatchModel::build(black_box(network), ModelOptions::default()))
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_week");
    group.sample_size(10);
    let strategy = LpDispatch::default();
    for batteries in [0, 1, 6] {
        let network = network(168, batteries);
        group.bench_with_input(BenchmarkId::from_parameter(batteries), &network, |b, network| {
            b.iter(|| strategy.dispatch(black_box(network)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_solve);
criterion_main!(benches);
