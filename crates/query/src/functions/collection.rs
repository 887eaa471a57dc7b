//! Collection constructors and `coalesce`.

use super::{compile_operands, map_values, operands, register_scalar, Arity};
use crate::ast::Expr;
use crate::compiler::ValueMapper;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use rivulet_core::{Error, Record, Result, Value};
use std::sync::Arc;

/// `new_map(k1, v1, k2, v2, ..)`
struct NewMap;

impl ValueMapFeature for NewMap {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let count = operands(expr)?.len();
        if count % 2 != 0 {
            return Err(Error::arity(expr.to_string(), "an even number", count));
        }
        let mappers = compile_operands(expr, Arity::AtLeast(0), metadata)?;
        Ok(map_values(
            mappers,
            Arc::new(|args: &[Value]| {
                let record = args
                    .chunks(2)
                    .map(|pair| (pair[0].to_string(), pair[1].clone()))
                    .collect::<Record>();
                Ok(Value::Record(record))
            }),
        ))
    }
}

/// The values of a record in key order; a list as is; anything else as a singleton.
fn row_to_array(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Record(record) => Value::List(record.values().cloned().collect()),
        Value::List(items) => Value::List(items.clone()),
        other => Value::List(vec![other.clone()]),
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("new_map"), Feature::value_map(NewMap));
    register_scalar(registry, &["new_array"], Arity::AtLeast(0), |args| Ok(Value::List(args.to_vec())));
    register_scalar(registry, &["row_to_array"], Arity::Exact(1), |args| Ok(row_to_array(&args[0])));
    register_scalar(registry, &["coalesce"], Arity::AtLeast(1), |args| {
        Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SelectStatement;
    use crate::compiler::test_support::eval;

    #[tokio::test]
    async fn test_new_map_and_array() {
        let expr = Expr::func(
            "new_map",
            vec![Expr::string("1"), Expr::int(1), Expr::string("2"), Expr::int(2)],
        );
        let expected = Value::from(Record::new().with("1", 1i64).with("2", 2i64));
        assert_eq!(eval(&expr, Value::Null).await, Ok(expected));

        let expr = Expr::func("new_array", (1..=4).map(Expr::int).collect());
        let expected = Value::List((1..=4).map(Value::Int64).collect());
        assert_eq!(eval(&expr, Value::Null).await, Ok(expected));
    }

    #[tokio::test]
    async fn test_new_map_odd_arguments() {
        let expr = Expr::func("new_map", vec![Expr::string("1"), Expr::int(1), Expr::string("2")]);
        let err = eval(&expr, Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Arity { got: 3, .. }));
    }

    #[tokio::test]
    async fn test_row_to_array_of_subquery() {
        let sub = SelectStatement::new()
            .select_as(Expr::int(1), "a1")
            .select_as(Expr::int(2), "a2");
        let expr = Expr::func("row_to_array", vec![Expr::subquery(sub)]);
        assert_eq!(
            eval(&expr, Value::Null).await,
            Ok(Value::List(vec![Value::Int64(1), Value::Int64(2)]))
        );

        let sub = SelectStatement::new().select_as(Expr::int(1), "a1");
        let expr = Expr::func("concat", vec![Expr::func("row_to_array", vec![Expr::subquery(sub)])]);
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::from("1")));
    }

    #[tokio::test]
    async fn test_coalesce() {
        let expr = Expr::func("coalesce", vec![Expr::null(), Expr::col("missing"), Expr::int(3)]);
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::Int64(3)));
    }
}
