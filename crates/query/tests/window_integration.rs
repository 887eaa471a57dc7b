//! Windowed grouping over timed sources, on tokio's paused clock.

use futures::{stream, StreamExt, TryStreamExt};
use rivulet_core::{Record, Result, Value};
use rivulet_query::ast::{Expr, SelectStatement};
use rivulet_query::{DataSource, Plan, RecordStream, StaticSources};
use std::sync::Arc;
use std::time::Duration;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Emits `0..n`, sleeping `every` before each element.
fn ticking(n: i64, every: Duration) -> Arc<dyn DataSource> {
    Arc::new(move |_name: &str| -> Result<RecordStream> {
        Ok(stream::iter(0..n)
            .then(move |i| async move {
                tokio::time::sleep(every).await;
                Ok(Value::Int64(i))
            })
            .boxed())
    })
}

fn numbers(n: i64) -> Arc<dyn DataSource> {
    Arc::new(StaticSources::new().with("t", (0..n).map(Value::from)))
}

async fn run(statement: SelectStatement, sources: Arc<dyn DataSource>) -> Vec<Value> {
    Plan::compile(&statement)
        .unwrap()
        .run(sources)
        .try_collect()
        .await
        .unwrap()
}

fn column(rows: &[Value], name: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| row.get_path(name).cloned().unwrap_or(Value::Null))
        .collect()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int64(*v)).collect()
}

fn interval(duration: &str) -> Expr {
    Expr::func("interval", vec![Expr::string(duration)])
}

#[tokio::test(start_paused = true)]
async fn test_interval_window() {
    init();
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(interval("1s"));
    let rows = run(statement, ticking(10, Duration::from_millis(500))).await;
    assert_eq!(column(&rows, "n"), ints(&[1, 2, 2, 2, 2, 1]));
}

#[tokio::test(start_paused = true)]
async fn test_interval_window_with_having() {
    init();
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(interval("1s"))
        .having(Expr::gt(Expr::count_star(), Expr::int(1)));
    let rows = run(statement, ticking(10, Duration::from_millis(500))).await;
    assert_eq!(rows.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_having_on_select_alias() {
    init();
    // window averages: 0, 1.5, 3.5, 5.5, 7.5, 9
    let statement = SelectStatement::new()
        .select_as(Expr::func("avg", vec![Expr::this()]), "total")
        .from("t")
        .group_by(interval("1s"))
        .having(Expr::gt(Expr::col("total"), Expr::int(2)));
    let rows = run(statement, ticking(10, Duration::from_millis(500))).await;
    assert_eq!(
        column(&rows, "total"),
        vec![Value::Float64(3.5), Value::Float64(5.5), Value::Float64(7.5), Value::Float64(9.0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_sliding_time_window() {
    init();
    // 2s windows opening every 200ms; records land at 100..=1000ms
    let window = Expr::func("_window", vec![Expr::string("200S"), Expr::string("2s")]);
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(window);
    let rows = run(statement, ticking(10, Duration::from_millis(100))).await;
    assert_eq!(column(&rows, "n"), ints(&[10, 9, 7, 5, 3, 1]));
}

#[tokio::test]
async fn test_predicate_window_consecutive_matches() {
    init();
    let boundary = Expr::func("eq", vec![Expr::div(Expr::this(), Expr::int(2)), Expr::int(0)]);
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(Expr::func("_window", vec![boundary]));
    // 0 and 1 both match; only the first starts a new window
    let rows = run(statement, numbers(10)).await;
    assert_eq!(column(&rows, "n"), ints(&[1, 9]));
}

#[tokio::test(start_paused = true)]
async fn test_window_with_key() {
    init();
    let source: Arc<dyn DataSource> = Arc::new(|_name: &str| -> Result<RecordStream> {
        Ok(stream::iter(0..8i64)
            .then(|i| async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                let kind = if i % 2 == 0 { "even" } else { "odd" };
                Ok(Value::from(Record::new().with("kind", kind).with("v", i)))
            })
            .boxed())
    });
    let statement = SelectStatement::new()
        .select(Expr::col("kind"))
        .select_as(Expr::func("sum", vec![Expr::col("v")]), "total")
        .from("t")
        .group_by(Expr::col("kind"))
        .group_by(interval("1200ms"));
    // records land at 300..2400ms: the first window holds 0..=2, the second 3..=6, the last 7
    let rows = run(statement, source).await;
    assert_eq!(
        column(&rows, "kind"),
        vec![
            Value::from("even"),
            Value::from("odd"),
            Value::from("odd"),
            Value::from("even"),
            Value::from("odd"),
        ]
    );
    assert_eq!(column(&rows, "total"), ints(&[2, 1, 8, 10, 7]));
}

#[tokio::test]
async fn test_count_window() {
    init();
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(Expr::func("_window", vec![Expr::int(2)]));
    let rows = run(statement, numbers(10)).await;
    assert_eq!(column(&rows, "n"), ints(&[2, 2, 2, 2, 2]));
}

#[tokio::test]
async fn test_sliding_count_window() {
    init();
    let statement = SelectStatement::new()
        .select_as(Expr::func("sum", vec![Expr::this()]), "s")
        .from("t")
        .group_by(Expr::func("_window", vec![Expr::int(4), Expr::int(2)]));
    let rows = run(statement, numbers(8)).await;
    // [0..4), [2..6), [4..8), then the partial [6..8)
    assert_eq!(column(&rows, "s"), ints(&[6, 14, 22, 13]));
}

#[tokio::test]
async fn test_predicate_window() {
    init();
    let boundary = Expr::func("eq", vec![Expr::div(Expr::this(), Expr::int(2)), Expr::int(0)]);
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .filter(Expr::gt(Expr::this(), Expr::int(0)))
        .group_by(Expr::func("_window", vec![boundary]));
    let rows = run(statement, numbers(10)).await;
    assert_eq!(column(&rows, "n"), ints(&[1, 8]));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_output_cancels_source() {
    init();
    // an endless ticking source; taking two windows must complete
    let source: Arc<dyn DataSource> = Arc::new(|_name: &str| -> Result<RecordStream> {
        Ok(stream::repeat(())
            .then(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(Value::Int64(1))
            })
            .boxed())
    });
    let statement = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t")
        .group_by(interval("1s"));
    let rows: Vec<Value> = Plan::compile(&statement)
        .unwrap()
        .run(source)
        .take(2)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}
