//! Benchmarks for rivulet-incremental accumulators.
//!
//! Target: single update < 100ns

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rivulet_core::Value;
use rivulet_incremental::{
    Accumulator, IncrementalAvg, IncrementalCount, IncrementalCountDistinct, IncrementalMax,
    IncrementalStdDev, IncrementalSum,
};

/// Feeds `values` into a fresh accumulator, the way one window instance does.
fn run<A: Accumulator>(fresh: impl Fn() -> A, values: &[Value]) -> Value {
    let mut acc = fresh();
    for v in values {
        acc.update(v).unwrap();
    }
    acc.finish()
}

fn bench_accumulators(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator");

    for size in [10, 100, 1000] {
        let ints: Vec<Value> = (0..size).map(|i| Value::Int64(i as i64)).collect();
        let floats: Vec<Value> = (0..size).map(|i| Value::Float64(i as f64 * 0.5)).collect();

        group.bench_with_input(BenchmarkId::new("count", size), &ints, |b, values| {
            b.iter(|| run(IncrementalCount::rows, black_box(values)))
        });

        group.bench_with_input(BenchmarkId::new("sum_int", size), &ints, |b, values| {
            b.iter(|| run(IncrementalSum::new, black_box(values)))
        });

        group.bench_with_input(BenchmarkId::new("avg_float", size), &floats, |b, values| {
            b.iter(|| run(IncrementalAvg::new, black_box(values)))
        });

        group.bench_with_input(BenchmarkId::new("max", size), &floats, |b, values| {
            b.iter(|| run(IncrementalMax::new, black_box(values)))
        });

        group.bench_with_input(BenchmarkId::new("stddev", size), &floats, |b, values| {
            b.iter(|| run(IncrementalStdDev::new, black_box(values)))
        });

        group.bench_with_input(BenchmarkId::new("count_distinct", size), &ints, |b, values| {
            b.iter(|| run(IncrementalCountDistinct::new, black_box(values)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_accumulators);
criterion_main!(benches);
