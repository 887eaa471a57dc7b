//! `cast(x as T)`: the `value-map:cast` dispatcher and the `cast:` targets.

use crate::ast::Expr;
use crate::compiler::{compile_value, ValueMapper};
use crate::context::EvalContext;
use crate::feature::{CastFeature, Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use futures::FutureExt;
use rivulet_core::{DataType, Error, Result, Value};
use std::sync::Arc;

/// Casts to a fixed `DataType`.
#[derive(Clone, Copy, Debug)]
pub struct TypeCast(pub DataType);

impl CastFeature for TypeCast {
    fn cast(&self, value: &Value) -> Result<Value> {
        value.cast_to(self.0)
    }
}

struct Cast;

impl ValueMapFeature for Cast {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let Expr::Cast { expr: operand, data_type } = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let target = metadata.cast(data_type).ok_or_else(|| {
            Error::unsupported_feature(FeatureId::cast(data_type).to_string(), expr.to_string())
        })?;
        let operand = compile_value(operand, metadata)?;
        Ok(Arc::new(move |ctx: &EvalContext| {
            let eval = operand(ctx);
            let target = target.clone();
            async move { target.cast(&eval.await?) }.boxed()
        }))
    }
}

const TARGETS: &[&str] = &[
    "string", "varchar", "boolean", "bool", "int", "integer", "long", "bigint", "double", "float",
    "decimal", "date", "datetime", "timestamp",
];

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("cast"), Feature::value_map(Cast));
    for name in TARGETS {
        if let Some(data_type) = DataType::from_sql_name(name) {
            registry.register(FeatureId::cast(name), Feature::cast(TypeCast(data_type)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::eval;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_cast_targets() {
        let cases = [
            (Expr::cast(Expr::this(), "string"), Value::from("1")),
            (Expr::cast(Expr::string("y"), "boolean"), Value::Boolean(true)),
            (Expr::cast(Expr::string("1"), "bool"), Value::Boolean(true)),
            (Expr::cast(Expr::string("false"), "bool"), Value::Boolean(false)),
            (Expr::cast(Expr::float(100.2), "int"), Value::Int32(100)),
            (Expr::cast(Expr::string("100.3"), "double"), Value::Float64(100.3)),
            (
                Expr::cast(Expr::sub(Expr::float(101.3), Expr::this()), "float"),
                Value::Float32(100.3),
            ),
            (
                Expr::cast(Expr::string("1.0E32"), "decimal"),
                Value::Decimal(BigDecimal::from_str("1.0E32").unwrap()),
            ),
        ];
        for (expr, expected) in cases {
            assert_eq!(eval(&expr, Value::Int64(1)).await, Ok(expected), "{}", expr);
        }
    }

    #[tokio::test]
    async fn test_cast_date() {
        let v = eval(&Expr::cast(Expr::string("2020-01-01"), "date"), Value::Null).await;
        assert_eq!(v, Ok(Value::DateTime(1_577_836_800_000)));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let err = eval(&Expr::cast(Expr::this(), "blob"), Value::Null).await.unwrap_err();
        assert_eq!(err, Error::unsupported_feature("cast:blob", "cast(this as blob)"));
    }

    #[tokio::test]
    async fn test_invalid_value() {
        let err = eval(&Expr::cast(Expr::string("abc"), "int"), Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Cast { .. }));
    }
}
