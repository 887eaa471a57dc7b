//! Select list evaluation.

use crate::ast::SelectItem;
use crate::compiler::{compile_value, eval_all, ValueMapper};
use crate::context::EvalContext;
use crate::feature::QueryMetadata;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use rivulet_core::{Record, Result, Value};
use std::sync::Arc;

enum Column {
    Wildcard,
    Named(String),
}

/// Compiled select list.
///
/// `*` or an unaliased `this` on its own passes the row through unchanged, even
/// when it is not a record. Otherwise the output is a record keyed by each item's
/// output name; `*` among other items copies the row's fields.
pub(crate) struct Projection {
    pass_through: bool,
    columns: Arc<[Column]>,
    mappers: Arc<[ValueMapper]>,
}

impl Projection {
    pub fn compile(items: &[SelectItem], metadata: &QueryMetadata) -> Result<Self> {
        let pass_through = match items {
            [] | [SelectItem::Wildcard] => true,
            [SelectItem::Expr { expr, alias: None }] => expr.is_this(),
            _ => false,
        };
        let mut columns = Vec::with_capacity(items.len());
        let mut mappers = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SelectItem::Wildcard => columns.push(Column::Wildcard),
                SelectItem::Expr { expr, .. } => {
                    columns.push(Column::Named(item.output_name()));
                    mappers.push(compile_value(expr, metadata)?);
                }
            }
        }
        Ok(Self {
            pass_through,
            columns: columns.into(),
            mappers: mappers.into(),
        })
    }

    pub fn apply(&self, ctx: &EvalContext) -> BoxFuture<'static, Result<Value>> {
        if self.pass_through {
            return future::ready(Ok(ctx.row().clone())).boxed();
        }
        let pending = eval_all(&self.mappers, ctx);
        let columns = self.columns.clone();
        let row = ctx.row().clone();
        async move {
            let mut values = pending.await?.into_iter();
            let mut record = Record::new();
            for column in columns.iter() {
                match column {
                    Column::Wildcard => {
                        if let Value::Record(fields) = &row {
                            record.merge(fields);
                        }
                    }
                    Column::Named(name) => {
                        record.insert(name.clone(), values.next().unwrap_or(Value::Null));
                    }
                }
            }
            Ok(Value::Record(record))
        }
        .boxed()
    }
}

/// `base` with the projected columns laid over it.
pub(crate) fn overlay(base: &Value, projected: &Value) -> Value {
    match (base, projected) {
        (Value::Record(base), Value::Record(projected)) => {
            let mut merged = base.clone();
            merged.merge(projected);
            Value::Record(merged)
        }
        (_, projected) => projected.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, SelectStatement};
    use crate::compiler::test_support::ctx_for;

    async fn project(statement: SelectStatement, row: Value) -> Value {
        let projection = Projection::compile(&statement.items, &QueryMetadata::new()).unwrap();
        projection.apply(&ctx_for(row)).await.unwrap()
    }

    fn device() -> Value {
        Value::from(Record::new().with("id", "d-1").with("temp", 21i64))
    }

    #[tokio::test]
    async fn test_pass_through() {
        assert_eq!(project(SelectStatement::new().select_all(), Value::Int64(3)).await, Value::Int64(3));
        assert_eq!(project(SelectStatement::new().select(Expr::this()), device()).await, device());
    }

    #[tokio::test]
    async fn test_named_columns() {
        let statement = SelectStatement::new()
            .select(Expr::col("id"))
            .select_as(Expr::add(Expr::col("temp"), Expr::int(1)), "next")
            .select_as(Expr::this(), "raw");
        let expected = Record::new()
            .with("id", "d-1")
            .with("next", 22i64)
            .with("raw", device());
        assert_eq!(project(statement, device()).await, Value::from(expected));
    }

    #[tokio::test]
    async fn test_wildcard_with_columns() {
        let statement = SelectStatement::new()
            .select_all()
            .select_as(Expr::int(1), "temp");
        let expected = Record::new().with("id", "d-1").with("temp", 1i64);
        assert_eq!(project(statement, device()).await, Value::from(expected));
    }

    #[test]
    fn test_overlay() {
        let projected = Value::from(Record::new().with("total", 3i64));
        let merged = overlay(&device(), &projected);
        assert_eq!(merged.get_path("total"), Some(&Value::Int64(3)));
        assert_eq!(merged.get_path("id"), Some(&Value::from("d-1")));
        assert_eq!(overlay(&Value::Int64(1), &projected), projected);
    }
}
