//! Compiled select statements.

use super::projection::{overlay, Projection};
use super::source::SourcePlan;
use super::stage::{self, Shaped};
use crate::aggregate::AggregateSet;
use crate::ast::{Expr, Limit, QueryParser, SelectItem, SelectStatement, SortOrder};
use crate::compiler::{compile_predicate, compile_value, eval_all, RowPredicate, ValueMapper};
use crate::context::{DataSource, EvalContext, RecordStream, SingleStream};
use crate::feature::QueryMetadata;
use crate::settings::QuerySettings;
use crate::window::{group_stream, GroupPlan, GroupRow, WindowSpec};
use core::fmt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use log::debug;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

/// An immutable, compiled query.
///
/// Compiling resolves every feature and builds every closure once; each run opens
/// its sources anew and owns its own group and window state, so one plan can be
/// executed any number of times, concurrently if need be.
///
/// ```rust
/// use futures::TryStreamExt;
/// use rivulet_core::Value;
/// use rivulet_query::ast::{Expr, SelectStatement};
/// use rivulet_query::{Plan, StaticSources};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rivulet_core::Result<()> {
/// let query = SelectStatement::new()
///     .select(Expr::this())
///     .from("numbers")
///     .filter(Expr::gt(Expr::this(), Expr::int(1)));
/// let plan = Plan::compile(&query)?;
///
/// let sources = StaticSources::new().with("numbers", (0..4i64).map(Value::from));
/// let rows: Vec<Value> = plan.run(Arc::new(sources)).try_collect().await?;
/// assert_eq!(rows, vec![Value::Int64(2), Value::Int64(3)]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Plan {
    inner: Arc<PlanInner>,
}

struct PlanInner {
    text: String,
    settings: Arc<QuerySettings>,
    source: SourcePlan,
    selection: Option<RowPredicate>,
    grouping: Option<Arc<GroupPlan>>,
    projection: Projection,
    having: Option<RowPredicate>,
    order_keys: Arc<[ValueMapper]>,
    orders: Vec<SortOrder>,
    distinct: bool,
    limit: Option<Limit>,
}

impl Plan {
    /// Compiles against the global registry and default settings.
    pub fn compile(statement: &SelectStatement) -> Result<Self> {
        Self::compile_with(statement, &QueryMetadata::new())
    }

    /// Parses `sql` with `parser`, then compiles it.
    pub fn compile_sql(sql: &str, parser: &dyn QueryParser, metadata: &QueryMetadata) -> Result<Self> {
        let statement = parser.parse(sql)?;
        Self::compile_with(&statement, metadata)
    }

    pub fn compile_with(statement: &SelectStatement, metadata: &QueryMetadata) -> Result<Self> {
        let text = statement.to_string();
        let source = SourcePlan::compile(statement, metadata)?;
        let selection = statement
            .selection
            .as_ref()
            .map(|expr| compile_predicate(expr, metadata))
            .transpose()?;

        let shaping_exprs = statement
            .items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr { expr, .. } => Some(expr),
                SelectItem::Wildcard => None,
            })
            .chain(statement.having.as_ref())
            .chain(statement.order_by.iter().map(|order| &order.expr));
        let aggregates = AggregateSet::collect(shaping_exprs, metadata)?;

        let grouped = !statement.group_by.is_empty() || statement.having.is_some() || !aggregates.is_empty();
        let (grouping, shaping) = if grouped {
            let (keys, window) = compile_group_by(&statement.group_by, metadata)?;
            let plan = GroupPlan {
                keys,
                window,
                aggregates: aggregates.specs().to_vec(),
            };
            (Some(Arc::new(plan)), aggregates.scope(metadata))
        } else {
            (None, metadata.clone())
        };

        let projection = Projection::compile(&statement.items, &shaping)?;
        let having = statement
            .having
            .as_ref()
            .map(|expr| compile_predicate(expr, &shaping))
            .transpose()?;
        let order_keys = statement
            .order_by
            .iter()
            .map(|order| compile_value(&order.expr, &shaping))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "compiled `{}`: grouped={}, aggregates={}",
            text,
            grouped,
            aggregates.len()
        );
        Ok(Self {
            inner: Arc::new(PlanInner {
                text,
                settings: metadata.settings().clone(),
                source,
                selection,
                grouping,
                projection,
                having,
                order_keys: order_keys.into(),
                orders: statement.order_by.iter().map(|order| order.order).collect(),
                distinct: statement.distinct,
                limit: statement.limit,
            }),
        })
    }

    /// Runs against `sources` with the plan's settings.
    pub fn run(&self, sources: Arc<dyn DataSource>) -> RecordStream {
        self.execute(EvalContext::new(sources, self.inner.settings.clone()))
    }

    /// Runs with every source name bound to `input`.
    pub fn run_stream(&self, input: RecordStream) -> RecordStream {
        self.run(Arc::new(SingleStream::new(input)))
    }

    /// Runs as a top-level statement in `ctx`.
    pub fn execute(&self, ctx: EvalContext) -> RecordStream {
        self.stream(ctx, false)
    }

    /// Runs as a sub-select of the record `ctx` is positioned on.
    pub fn run_in(&self, ctx: &EvalContext) -> RecordStream {
        self.stream(ctx.clone(), true)
    }

    pub(super) fn stream(&self, ctx: EvalContext, nested: bool) -> RecordStream {
        let inner = &self.inner;
        let policy = ctx.settings().error_policy;
        let (records, ctx) = inner.source.open(&ctx, nested);

        let records = match &inner.selection {
            Some(predicate) => {
                let predicate = predicate.clone();
                let ctx = ctx.clone();
                stage::stage(records, policy, move |row: Value| {
                    let test = predicate(&ctx, &row);
                    async move { Ok(test.await?.then_some(row)) }.boxed()
                })
            }
            None => records,
        };

        let shaped = match &inner.grouping {
            Some(grouping) => {
                let groups = group_stream(records, grouping.clone(), ctx.clone());
                let plan = self.clone();
                stage::stage(groups, policy, move |group: GroupRow| {
                    let group_ctx = ctx.with_group(group.sample, group.aggregates);
                    plan.shape(group_ctx)
                })
            }
            None => {
                let plan = self.clone();
                stage::stage(records, policy, move |row: Value| plan.shape(ctx.with_row(row)))
            }
        };

        let shaped = if inner.distinct { stage::distinct(shaped) } else { shaped };
        let shaped = if inner.orders.is_empty() {
            shaped
        } else {
            stage::order_by(shaped, inner.orders.clone())
        };
        let rows: BoxStream<'static, Result<Value>> = shaped.map(|item| item.map(|shaped| shaped.row)).boxed();
        match inner.limit {
            Some(limit) => stage::limit(rows, limit),
            None => rows,
        }
    }

    /// Projects the row `ctx` is positioned on, then applies `having` and computes
    /// the sort keys over the projected columns laid over the input row.
    fn shape(&self, ctx: EvalContext) -> BoxFuture<'static, Result<Option<Shaped>>> {
        let inner = self.inner.clone();
        let projected = inner.projection.apply(&ctx);
        async move {
            let row = projected.await?;
            let needs_view = inner.having.is_some() || !inner.order_keys.is_empty();
            let view_ctx = if needs_view {
                ctx.with_row(overlay(ctx.row(), &row))
            } else {
                ctx
            };
            if let Some(having) = &inner.having {
                if !having(&view_ctx, view_ctx.row()).await? {
                    return Ok(None);
                }
            }
            let keys = if inner.order_keys.is_empty() {
                Vec::new()
            } else {
                eval_all(&inner.order_keys, &view_ctx).await?
            };
            Ok(Some(Shaped { row, keys }))
        }
        .boxed()
    }
}

/// Splits `group by` into key expressions and at most one window call.
fn compile_group_by(exprs: &[Expr], metadata: &QueryMetadata) -> Result<(Vec<ValueMapper>, Option<WindowSpec>)> {
    let mut keys = Vec::new();
    let mut window = None;
    for expr in exprs {
        let group = expr
            .as_function()
            .and_then(|call| metadata.group(&call.name).map(|feature| (call, feature)));
        match group {
            Some((call, feature)) => {
                if window.is_some() {
                    return Err(Error::unsupported_expression(expr.to_string()));
                }
                window = Some(feature.create_window(call, metadata)?);
            }
            None => keys.push(compile_value(expr, metadata)?),
        }
    }
    Ok((keys, window))
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("query", &self.inner.text)
            .field("grouped", &self.inner.grouping.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FromItem, JoinKind};
    use crate::context::StaticSources;
    use crate::settings::ErrorPolicy;
    use futures::{stream, TryStreamExt};
    use rivulet_core::Record;

    fn numbers(n: i64) -> Arc<dyn DataSource> {
        Arc::new(StaticSources::new().with("t", (0..n).map(Value::from)))
    }

    async fn rows(statement: SelectStatement, sources: Arc<dyn DataSource>) -> Result<Vec<Value>> {
        Plan::compile(&statement)?.run(sources).try_collect().await
    }

    #[tokio::test]
    async fn test_filter_and_project() {
        let statement = SelectStatement::new()
            .select_as(Expr::mul(Expr::this(), Expr::int(10)), "v")
            .from("t")
            .filter(Expr::gt(Expr::this(), Expr::int(2)));
        let out = rows(statement, numbers(5)).await.unwrap();
        assert_eq!(
            out,
            vec![
                Value::from(Record::new().with("v", 30i64)),
                Value::from(Record::new().with("v", 40i64)),
            ]
        );
    }

    #[tokio::test]
    async fn test_global_count() {
        let statement = SelectStatement::new()
            .select_as(Expr::count_star(), "total")
            .from("t");
        let out = rows(statement.clone(), numbers(7)).await.unwrap();
        assert_eq!(out, vec![Value::from(Record::new().with("total", 7i64))]);
        let out = rows(statement, numbers(0)).await.unwrap();
        assert_eq!(out, vec![Value::from(Record::new().with("total", 0i64))]);
    }

    #[tokio::test]
    async fn test_group_having_order_limit() {
        let statement = SelectStatement::new()
            .select_as(Expr::modulo(Expr::this(), Expr::int(3)), "k")
            .select_as(Expr::count_star(), "n")
            .from("t")
            .group_by(Expr::modulo(Expr::this(), Expr::int(3)))
            .having(Expr::gt(Expr::col("n"), Expr::int(3)))
            .order_by(Expr::col("k"), SortOrder::Desc)
            .limit(0, 1);
        // 0..10: k=0 -> 4 rows, k=1 -> 3 rows, k=2 -> 3 rows
        let out = rows(statement, numbers(10)).await.unwrap();
        assert_eq!(out, vec![Value::from(Record::new().with("k", 0i64).with("n", 4i64))]);
    }

    #[tokio::test]
    async fn test_distinct() {
        let statement = SelectStatement::new()
            .select(Expr::modulo(Expr::this(), Expr::int(2)))
            .distinct()
            .from("t");
        assert_eq!(rows(statement, numbers(6)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_select_without_from_reads_default_source() {
        let sources = Arc::new(StaticSources::new().with("dual", vec![Value::Null]));
        let statement = SelectStatement::new().select_as(Expr::int(1), "one");
        let out = rows(statement, sources).await.unwrap();
        assert_eq!(out, vec![Value::from(Record::new().with("one", 1i64))]);
    }

    #[tokio::test]
    async fn test_subquery_source_and_join() {
        let inner = SelectStatement::new()
            .select_as(Expr::this(), "v")
            .from("t")
            .filter(Expr::lt(Expr::this(), Expr::int(2)));
        let statement = SelectStatement::new()
            .select(Expr::col("a.v"))
            .select(Expr::col("b.v"))
            .from_item(FromItem::subquery(inner.clone(), Some("a")))
            .join(
                JoinKind::Inner,
                FromItem::subquery(inner, Some("b")),
                Some(Expr::eq(Expr::col("a.v"), Expr::col("b.v"))),
            );
        let out = rows(statement, numbers(5)).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], Value::from(Record::new().with("a.v", 1i64).with("b.v", 1i64)));
    }

    #[tokio::test]
    async fn test_two_windows_rejected() {
        let statement = SelectStatement::new()
            .select(Expr::count_star())
            .from("t")
            .group_by(Expr::func("_window", vec![Expr::int(2)]))
            .group_by(Expr::func("interval", vec![Expr::string("1s")]));
        assert!(matches!(
            Plan::compile(&statement),
            Err(Error::UnsupportedExpression { .. })
        ));
    }

    #[tokio::test]
    async fn test_error_policy() {
        let statement = SelectStatement::new()
            .select_as(Expr::cast(Expr::this(), "int"), "v")
            .from("t");
        let input = || {
            let values = vec![Value::from("1"), Value::from("x"), Value::from("3")];
            Arc::new(StaticSources::new().with("t", values)) as Arc<dyn DataSource>
        };
        let failing: Vec<Result<Value>> = Plan::compile(&statement).unwrap().run(input()).collect().await;
        assert_eq!(failing.len(), 2);
        assert!(failing[1].is_err());

        let metadata = QueryMetadata::new().with_settings(QuerySettings::default().with_error_policy(ErrorPolicy::Skip));
        let skipping: Vec<Value> = Plan::compile_with(&statement, &metadata)
            .unwrap()
            .run(input())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(skipping.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stream_and_rerun() {
        let plan = Plan::compile(&SelectStatement::new().select(Expr::this()).from("any")).unwrap();
        for _ in 0..2 {
            let input = stream::iter(vec![Ok(Value::Int64(1)), Ok(Value::Int64(2))]).boxed();
            let out: Vec<Value> = plan.run_stream(input).try_collect().await.unwrap();
            assert_eq!(out.len(), 2);
        }
    }

    #[test]
    fn test_parse_errors_pass_through() {
        let parser = |_: &str| -> Result<SelectStatement> { Err(Error::parse("unexpected token")) };
        let err = Plan::compile_sql("select", &parser, &QueryMetadata::new()).unwrap_err();
        assert_eq!(err, Error::parse("unexpected token"));
    }
}
