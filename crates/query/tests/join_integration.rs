//! Integration tests for joins between named sources.

use futures::{StreamExt, TryStreamExt};
use rivulet_core::{Error, Record, Result, Value};
use rivulet_query::ast::{Expr, FromItem, JoinKind, SelectStatement};
use rivulet_query::{DataSource, Plan, StaticSources};
use std::sync::Arc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `count` rows of `{id, name}` named after `table`.
fn table_rows(table: &str, count: i64) -> Vec<Value> {
    (0..count)
        .map(|i| {
            Value::from(
                Record::new()
                    .with("id", i)
                    .with("name", format!("{}-{}", table, i)),
            )
        })
        .collect()
}

fn sources(t1: i64, t2: i64, t3: i64) -> Arc<dyn DataSource> {
    Arc::new(
        StaticSources::new()
            .with("t1", table_rows("t1", t1))
            .with("t2", table_rows("t2", t2))
            .with("t3", table_rows("t3", t3)),
    )
}

async fn run(statement: SelectStatement, sources: Arc<dyn DataSource>) -> Result<Vec<Value>> {
    Plan::compile(&statement)?.run(sources).try_collect().await
}

fn column(rows: &[Value], name: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            row.as_record()
                .and_then(|r| r.get(name))
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect()
}

fn on_id(left: &str, right: &str) -> Option<Expr> {
    Some(Expr::eq(
        Expr::col(&format!("{}.id", left)),
        Expr::col(&format!("{}.id", right)),
    ))
}

fn names() -> SelectStatement {
    SelectStatement::new()
        .select(Expr::col("t1.name"))
        .select(Expr::col("t2.name"))
}

#[tokio::test]
async fn test_left_join() {
    init();
    let statement = names()
        .from("t1")
        .join(JoinKind::Left, FromItem::table("t2"), on_id("t1", "t2"));
    let rows = run(statement, sources(3, 2, 0)).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        column(&rows, "t1.name"),
        vec![Value::from("t1-0"), Value::from("t1-1"), Value::from("t1-2")]
    );
    assert_eq!(
        column(&rows, "t2.name"),
        vec![Value::from("t2-0"), Value::from("t2-1"), Value::Null]
    );
}

#[tokio::test]
async fn test_right_join() {
    init();
    let statement = names()
        .from("t1")
        .join(JoinKind::Right, FromItem::table("t2"), on_id("t1", "t2"));
    let rows = run(statement.clone(), sources(2, 2, 0)).await.unwrap();
    assert_eq!(rows.len(), 2);

    let rows = run(statement, sources(1, 3, 0)).await.unwrap();
    assert_eq!(
        column(&rows, "t1.name"),
        vec![Value::from("t1-0"), Value::Null, Value::Null]
    );
    assert_eq!(column(&rows, "t2.name").len(), 3);
}

#[tokio::test]
async fn test_inner_join() {
    init();
    let statement = names()
        .from("t1")
        .join(JoinKind::Inner, FromItem::table("t2"), on_id("t1", "t2"));
    let rows = run(statement, sources(4, 2, 0)).await.unwrap();
    assert_eq!(
        column(&rows, "t2.name"),
        vec![Value::from("t2-0"), Value::from("t2-1")]
    );
}

#[tokio::test]
async fn test_implicit_cross_join_with_where() {
    init();
    let statement = names()
        .from("t1")
        .also_from(FromItem::table("t2"))
        .filter(Expr::eq(Expr::col("t1.id"), Expr::col("t2.id")));
    let rows = run(statement, sources(3, 3, 0)).await.unwrap();
    assert_eq!(rows.len(), 3);

    let product = SelectStatement::new()
        .select_as(Expr::count_star(), "n")
        .from("t1")
        .also_from(FromItem::table("t2"));
    let rows = run(product, sources(3, 4, 0)).await.unwrap();
    assert_eq!(column(&rows, "n"), vec![Value::Int64(12)]);
}

#[tokio::test]
async fn test_three_way_join() {
    init();
    let statement = names()
        .select(Expr::col("t3.name"))
        .from("t1")
        .join(JoinKind::Inner, FromItem::table("t2"), on_id("t1", "t2"))
        .join(JoinKind::Left, FromItem::table("t3"), on_id("t2", "t3"));
    let rows = run(statement, sources(3, 3, 1)).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        column(&rows, "t3.name"),
        vec![Value::from("t3-0"), Value::Null, Value::Null]
    );
}

#[tokio::test]
async fn test_aliased_sources() {
    init();
    let statement = SelectStatement::new()
        .select_as(Expr::col("a.name"), "left_name")
        .select_as(Expr::col("b.name"), "right_name")
        .from_as("t1", "a")
        .join(JoinKind::Inner, FromItem::table_as("t1", "b"), Some(Expr::gt(Expr::col("a.id"), Expr::col("b.id"))));
    let rows = run(statement, sources(3, 0, 0)).await.unwrap();
    // pairs with a.id > b.id: (1,0), (2,0), (2,1)
    assert_eq!(rows.len(), 3);
    assert_eq!(
        column(&rows, "right_name"),
        vec![Value::from("t1-0"), Value::from("t1-0"), Value::from("t1-1")]
    );
}

#[tokio::test]
async fn test_subquery_source() {
    init();
    let small = SelectStatement::new()
        .select_all()
        .from("t2")
        .filter(Expr::lt(Expr::col("id"), Expr::int(1)));
    let statement = SelectStatement::new()
        .select(Expr::col("t1.name"))
        .select(Expr::col("s.name"))
        .from("t1")
        .join(JoinKind::Inner, FromItem::subquery(small, Some("s")), on_id("t1", "s"));
    let rows = run(statement, sources(3, 3, 0)).await.unwrap();
    assert_eq!(column(&rows, "s.name"), vec![Value::from("t2-0")]);
}

#[tokio::test]
async fn test_grouped_join() {
    init();
    let statement = SelectStatement::new()
        .select(Expr::col("t1.name"))
        .select_as(Expr::count_star(), "matches")
        .from("t1")
        .join(
            JoinKind::Inner,
            FromItem::table("t2"),
            Some(Expr::le(Expr::col("t2.id"), Expr::col("t1.id"))),
        )
        .group_by(Expr::col("t1.name"));
    let rows = run(statement, sources(3, 3, 0)).await.unwrap();
    assert_eq!(
        column(&rows, "matches"),
        vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
    );
}

#[tokio::test]
async fn test_missing_join_source() {
    init();
    let statement = names()
        .from("t1")
        .join(JoinKind::Inner, FromItem::table("nowhere"), on_id("t1", "nowhere"));
    let rows: Vec<Result<Value>> = Plan::compile(&statement)
        .unwrap()
        .run(sources(2, 0, 0))
        .collect()
        .await;
    assert_eq!(rows.len(), 1);
    assert!(matches!(rows[0], Err(Error::Source { .. })));
}
