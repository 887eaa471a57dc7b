//! The expression compiler.
//!
//! Dispatch is a match over the closed `Expr` variant set; named functions and
//! operators go through the registry. Boolean-shaped nodes are delegated to the
//! predicate compiler and wrapped, so they can appear wherever a value can.

use super::{compile_predicate, constant, predicate_as_value, ValueMapper};
use crate::ast::{BinaryOp, Expr, Sign};
use crate::context::EvalContext;
use crate::feature::QueryMetadata;
use futures::FutureExt;
use rivulet_core::{Error, Number, Result, Value};
use std::sync::Arc;

/// Compiles `expr` into a value-producing function.
///
/// Fails with `UnsupportedFeature` for unknown functions and `ArityError` for
/// fixed-arity operators called with the wrong operand count.
pub fn compile_value(expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
    match expr {
        Expr::Literal(literal) => Ok(constant(literal.to_value()?)),
        Expr::Column(_) => metadata
            .require_value_map("property", expr)?
            .create_mapper(expr, metadata),
        Expr::Function(call) => match metadata.value_map(&call.name) {
            Some(feature) => feature.create_mapper(expr, metadata),
            // `eq(a, b)` and friends in value position
            None if metadata.filter(&call.name).is_some() => {
                Ok(predicate_as_value(compile_predicate(expr, metadata)?))
            }
            None => metadata
                .require_value_map(&call.name, expr)?
                .create_mapper(expr, metadata),
        },
        Expr::SubQuery(_) => metadata
            .require_value_map("select", expr)?
            .create_mapper(expr, metadata),
        Expr::Case(_) => metadata
            .require_value_map("case-when", expr)?
            .create_mapper(expr, metadata),
        Expr::Cast { .. } => metadata
            .require_value_map("cast", expr)?
            .create_mapper(expr, metadata),
        Expr::Parenthesis(inner) => compile_value(inner, metadata),
        Expr::Signed { sign, expr: operand } => Ok(signed(*sign, compile_value(operand, metadata)?)),
        Expr::Binary { op, .. } => match op {
            BinaryOp::And | BinaryOp::Or => Ok(predicate_as_value(compile_predicate(expr, metadata)?)),
            _ => match metadata.value_map(op.symbol()) {
                Some(feature) => feature.create_mapper(expr, metadata),
                None => Ok(predicate_as_value(compile_predicate(expr, metadata)?)),
            },
        },
        Expr::Not(_)
        | Expr::IsNull { .. }
        | Expr::IsBoolean { .. }
        | Expr::Between { .. }
        | Expr::InList { .. } => Ok(predicate_as_value(compile_predicate(expr, metadata)?)),
    }
}

fn signed(sign: Sign, operand: ValueMapper) -> ValueMapper {
    Arc::new(move |ctx: &EvalContext| {
        let eval = operand(ctx);
        async move { apply_sign(sign, eval.await?) }.boxed()
    })
}

/// Applies a unary sign, keeping the operand's numeric category.
pub(crate) fn apply_sign(sign: Sign, value: Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let not_numeric = || Error::cast(&value, "number");
    let signed = match (sign, &value) {
        (Sign::Plus, v) if v.is_numeric() => value.clone(),
        (Sign::Minus, Value::Int32(v)) => v.checked_neg().map_or(Value::Int64(-i64::from(*v)), Value::Int32),
        (Sign::Minus, Value::Float32(v)) => Value::Float32(-v),
        (Sign::BitNot, Value::Int32(v)) => Value::Int32(!v),
        (Sign::Plus, _) => Number::from_value(&value).ok_or_else(not_numeric)?.into_value(),
        (Sign::Minus, _) => Number::from_value(&value).ok_or_else(not_numeric)?.negate().into_value(),
        (Sign::BitNot, _) => {
            let n = Number::from_value(&value).ok_or_else(not_numeric)?;
            if !n.is_integral() {
                return Err(Error::cast(&value, "long"));
            }
            Value::Int64(!n.to_i64().ok_or_else(not_numeric)?)
        }
    };
    Ok(signed)
}
