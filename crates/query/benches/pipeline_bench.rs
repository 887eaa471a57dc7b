//! Benchmarks for compiled pipelines.
//!
//! Plans are compiled once outside the measured loop; each iteration runs the plan
//! against an in-memory source on a current-thread runtime, so the numbers cover
//! closure evaluation and stream plumbing rather than compilation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::TryStreamExt;
use rivulet_core::{Record, Value};
use rivulet_query::ast::{Expr, FromItem, JoinKind, SelectStatement, SortOrder};
use rivulet_query::{DataSource, Plan, StaticSources};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Simple LCG for reproducible pseudo-random shuffling
fn shuffle_indices(count: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut s = seed;
    for i in (1..count).rev() {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (s as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

/// Sensor readings in shuffled order.
fn readings(count: usize) -> Vec<Value> {
    shuffle_indices(count, 12345)
        .into_iter()
        .map(|i| {
            Value::from(
                Record::new()
                    .with("id", i as i64)
                    .with("device", format!("device_{}", i % 100))
                    .with("temp", (i % 400) as f64 / 10.0),
            )
        })
        .collect()
}

fn sources(count: usize) -> Arc<dyn DataSource> {
    Arc::new(
        StaticSources::new()
            .with("readings", readings(count))
            .with("devices", readings(count / 10)),
    )
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn bench_plan(c: &mut Criterion, name: &str, statement: SelectStatement, sizes: &[usize]) {
    let rt = runtime();
    let plan = Plan::compile(&statement).unwrap();
    let mut group = c.benchmark_group(name);
    for size in sizes {
        let sources = sources(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let rows: Vec<Value> = rt
                    .block_on(plan.run(sources.clone()).try_collect::<Vec<Value>>())
                    .unwrap();
                black_box(rows)
            })
        });
    }
    group.finish();
}

fn bench_filter_project(c: &mut Criterion) {
    let statement = SelectStatement::new()
        .select(Expr::col("device"))
        .select_as(Expr::mul(Expr::col("temp"), Expr::float(1.8)), "fahrenheit")
        .from("readings")
        .filter(Expr::gt(Expr::col("temp"), Expr::int(20)));
    bench_plan(c, "filter_project", statement, &[1000, 10000]);
}

fn bench_group_by(c: &mut Criterion) {
    let statement = SelectStatement::new()
        .select(Expr::col("device"))
        .select_as(Expr::func("avg", vec![Expr::col("temp")]), "avg_temp")
        .select_as(Expr::count_star(), "n")
        .from("readings")
        .group_by(Expr::col("device"));
    bench_plan(c, "group_by", statement, &[1000, 10000]);
}

fn bench_count_window(c: &mut Criterion) {
    let statement = SelectStatement::new()
        .select_as(Expr::func("max", vec![Expr::col("temp")]), "peak")
        .from("readings")
        .group_by(Expr::func("_window", vec![Expr::int(100)]));
    bench_plan(c, "count_window", statement, &[1000, 10000]);
}

fn bench_order_limit(c: &mut Criterion) {
    let statement = SelectStatement::new()
        .select(Expr::col("id"))
        .from("readings")
        .order_by(Expr::col("temp"), SortOrder::Desc)
        .limit(0, 10);
    bench_plan(c, "order_limit", statement, &[1000, 10000]);
}

fn bench_nested_loop_join(c: &mut Criterion) {
    let statement = SelectStatement::new()
        .select(Expr::col("r.id"))
        .select(Expr::col("d.device"))
        .from_as("readings", "r")
        .join(
            JoinKind::Inner,
            FromItem::table_as("devices", "d"),
            Some(Expr::eq(Expr::col("r.id"), Expr::col("d.id"))),
        );
    // O(n*m): smaller inputs
    bench_plan(c, "nested_loop_join", statement, &[100, 500]);
}

criterion_group!(
    benches,
    bench_filter_project,
    bench_group_by,
    bench_count_window,
    bench_order_limit,
    bench_nested_loop_join,
);
criterion_main!(benches);
