//! `value-map:property`: column references.

use crate::ast::{ColumnRef, Expr};
use crate::compiler::ValueMapper;
use crate::context::EvalContext;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use futures::future;
use futures::FutureExt;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

/// Resolves `column` against the current record.
///
/// `this` is the whole record and `this.x` a path inside it. A qualified
/// `t.x` is looked up in the joined sub-record `t` first, then on the record
/// itself when the record came from source `t`, then as the literal dotted key.
/// Missing columns read as null.
pub fn resolve_column(ctx: &EvalContext, column: &ColumnRef) -> Value {
    let row = ctx.row();
    let found = match column.table.as_deref() {
        None if column.name == "this" => Some(row),
        None => row.get_path(&column.name),
        Some("this") => row.get_path(&column.name),
        Some(table) => match row.as_record().and_then(|r| r.get(table)) {
            Some(joined @ Value::Record(_)) => joined.get_path(&column.name),
            _ if ctx.alias() == Some(table) => row.get_path(&column.name),
            _ => row.get_path(&format!("{}.{}", table, column.name)),
        },
    };
    found.cloned().unwrap_or(Value::Null)
}

struct Property;

impl ValueMapFeature for Property {
    fn create_mapper(&self, expr: &Expr, _metadata: &QueryMetadata) -> Result<ValueMapper> {
        let column = expr
            .as_column()
            .cloned()
            .ok_or_else(|| Error::unsupported_expression(expr.to_string()))?;
        Ok(Arc::new(move |ctx: &EvalContext| {
            future::ready(Ok(resolve_column(ctx, &column))).boxed()
        }))
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("property"), Feature::value_map(Property));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::{ctx_for, eval};
    use rivulet_core::Record;

    #[tokio::test]
    async fn test_this_and_paths() {
        let row = Value::from(Record::new().with("a", Record::new().with("b", 1i64)).with("x.y", 2i64));
        assert_eq!(eval(&Expr::this(), Value::Int64(9)).await, Ok(Value::Int64(9)));
        assert_eq!(eval(&Expr::col("this.a.b"), row.clone()).await, Ok(Value::Int64(1)));
        assert_eq!(eval(&Expr::col("a"), row.clone()).await.map(|v| v.as_record().is_some()), Ok(true));
        assert_eq!(eval(&Expr::col("x.y"), row.clone()).await, Ok(Value::Int64(2)));
        assert_eq!(eval(&Expr::col("missing"), row).await, Ok(Value::Null));
    }

    #[test]
    fn test_qualified_resolution() {
        let joined = Value::from(
            Record::new()
                .with("t1", Record::new().with("name", "left"))
                .with("t2", Record::new().with("name", "right")),
        );
        let ctx = ctx_for(joined);
        assert_eq!(resolve_column(&ctx, &ColumnRef::parse("t2.name")), Value::from("right"));

        let ctx = ctx_for(Value::from(Record::new().with("name", "solo"))).with_alias(Some("t"));
        assert_eq!(resolve_column(&ctx, &ColumnRef::parse("t.name")), Value::from("solo"));
        assert_eq!(resolve_column(&ctx, &ColumnRef::parse("u.name")), Value::Null);
    }
}
