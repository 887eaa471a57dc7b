//! Filter features: comparisons, `between`, `in`, null and boolean tests, `like`.
//!
//! Comparisons go through `Value::sql_cmp`, so they are numeric-aware and any
//! comparison involving null is false.

use crate::ast::Expr;
use crate::compiler::{bind, compile_binary, compile_value, eval_pair, RowPredicate, ValueMapper};
use crate::context::EvalContext;
use crate::feature::{Feature, FeatureId, FeatureRegistry, FilterFeature, QueryMetadata};
use core::cmp::Ordering;
use futures::FutureExt;
use rivulet_core::cast::parse_bool;
use rivulet_core::pattern_match;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    fn test(self, left: &Value, right: &Value) -> bool {
        let Some(ord) = left.sql_cmp(right) else {
            return false;
        };
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::NotEq => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::LtEq => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::GtEq => ord != Ordering::Less,
        }
    }
}

/// Predicate over the two evaluated operands of `expr`.
fn binary_predicate(
    expr: &Expr,
    metadata: &QueryMetadata,
    test: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
) -> Result<RowPredicate> {
    let (left, right) = compile_binary(expr, metadata)?;
    let test = Arc::new(test);
    Ok(Arc::new(move |ctx: &EvalContext, row: &Value| {
        let operands = eval_pair(&left, &right, &bind(ctx, row));
        let test = test.clone();
        async move {
            let (l, r) = operands.await?;
            Ok(test(&l, &r))
        }
        .boxed()
    }))
}

struct Compare(CmpOp);

impl FilterFeature for Compare {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        let op = self.0;
        binary_predicate(expr, metadata, move |l, r| op.test(l, r))
    }
}

struct Like;

impl FilterFeature for Like {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        binary_predicate(expr, metadata, |value, pattern| match (value, pattern) {
            (Value::Null, _) | (_, Value::Null) => false,
            (value, pattern) => pattern_match::like(&value.to_string(), &pattern.to_string()),
        })
    }
}

struct Between;

impl FilterFeature for Between {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        let Expr::Between { expr: subject, low, high, negated } = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let operands = [
            compile_value(subject, metadata)?,
            compile_value(low, metadata)?,
            compile_value(high, metadata)?,
        ];
        let negated = *negated;
        Ok(Arc::new(move |ctx: &EvalContext, row: &Value| {
            let pending = crate::compiler::eval_all(&operands, &bind(ctx, row));
            async move {
                let values = pending.await?;
                let (v, low, high) = (&values[0], &values[1], &values[2]);
                if v.is_null() || low.is_null() || high.is_null() {
                    return Ok(false);
                }
                let inside = CmpOp::GtEq.test(v, low) && CmpOp::LtEq.test(v, high);
                Ok(inside != negated)
            }
            .boxed()
        }))
    }
}

/// `x [not] in (a, b, ..)`.
///
/// A list-valued element matches when any of its members does. Elements are
/// evaluated in order and evaluation stops at the first match.
struct InList;

impl FilterFeature for InList {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        let Expr::InList { expr: subject, list, negated } = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let subject = compile_value(subject, metadata)?;
        let list: Arc<[ValueMapper]> = list
            .iter()
            .map(|item| compile_value(item, metadata))
            .collect::<Result<Vec<_>>>()?
            .into();
        let negated = *negated;
        Ok(Arc::new(move |ctx: &EvalContext, row: &Value| {
            let ctx = bind(ctx, row);
            let subject = subject(&ctx);
            let list = list.clone();
            async move {
                let subject = subject.await?;
                if subject.is_null() {
                    return Ok(false);
                }
                for item in list.iter() {
                    let found = match item(&ctx).await? {
                        Value::List(values) => values.iter().any(|v| subject.sql_eq(v)),
                        value => subject.sql_eq(&value),
                    };
                    if found {
                        return Ok(!negated);
                    }
                }
                Ok(negated)
            }
            .boxed()
        }))
    }
}

struct IsNull;

impl FilterFeature for IsNull {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        let (subject, negated) = match expr {
            Expr::IsNull { expr, negated } => (expr.as_ref(), *negated),
            Expr::Function(call) if call.args.len() == 1 => (&call.args[0], false),
            Expr::Function(call) => return Err(Error::arity(expr.to_string(), "1", call.args.len())),
            _ => return Err(Error::unsupported_expression(expr.to_string())),
        };
        let subject = compile_value(subject, metadata)?;
        Ok(Arc::new(move |ctx: &EvalContext, row: &Value| {
            let eval = subject(&bind(ctx, row));
            async move { Ok(eval.await?.is_null() != negated) }.boxed()
        }))
    }
}

struct IsBoolean;

impl FilterFeature for IsBoolean {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
        let Expr::IsBoolean { expr: subject, value, negated } = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let subject = compile_value(subject, metadata)?;
        let (wanted, negated) = (*value, *negated);
        Ok(Arc::new(move |ctx: &EvalContext, row: &Value| {
            let eval = subject(&bind(ctx, row));
            async move {
                let actual = match eval.await? {
                    Value::Boolean(b) => Some(b),
                    Value::String(s) => parse_bool(&s),
                    _ => None,
                };
                Ok((actual == Some(wanted)) != negated)
            }
            .boxed()
        }))
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    let comparisons = [
        (&["=", "eq"][..], CmpOp::Eq),
        (&["<>", "!=", "neq"][..], CmpOp::NotEq),
        (&["<", "lt"][..], CmpOp::Lt),
        (&["<=", "lte"][..], CmpOp::LtEq),
        (&[">", "gt"][..], CmpOp::Gt),
        (&[">=", "gte"][..], CmpOp::GtEq),
    ];
    for (names, op) in comparisons {
        for name in names {
            registry.register(FeatureId::filter(name), Feature::filter(Compare(op)));
        }
    }
    registry.register(FeatureId::filter("like"), Feature::filter(Like));
    registry.register(FeatureId::filter("between"), Feature::filter(Between));
    registry.register(FeatureId::filter("in"), Feature::filter(InList));
    registry.register(FeatureId::filter("is_null"), Feature::filter(IsNull));
    registry.register(FeatureId::filter("is_boolean"), Feature::filter(IsBoolean));
}
