//! The predicate compiler.
//!
//! `and`/`or`/`not` are handled here and short-circuit; every other boolean node
//! resolves a `filter:` feature. Anything that is not boolean-shaped compiles as a
//! value and is tested for truthiness.

use super::{bind, compile_value, value_as_predicate, RowPredicate};
use crate::ast::{BinaryOp, Expr};
use crate::context::EvalContext;
use crate::feature::QueryMetadata;
use futures::FutureExt;
use rivulet_core::{Result, Value};
use std::sync::Arc;

/// Compiles `expr` into a record predicate.
pub fn compile_predicate(expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate> {
    match expr {
        Expr::Parenthesis(inner) => compile_predicate(inner, metadata),
        Expr::Not(inner) => Ok(negate(compile_predicate(inner, metadata)?)),
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => Ok(conjunction(
            compile_predicate(left, metadata)?,
            compile_predicate(right, metadata)?,
        )),
        Expr::Binary {
            left,
            op: BinaryOp::Or,
            right,
        } => Ok(disjunction(
            compile_predicate(left, metadata)?,
            compile_predicate(right, metadata)?,
        )),
        Expr::Binary { op, .. } => match metadata.filter(op.symbol()) {
            Some(feature) => feature.create_predicate(expr, metadata),
            // `where this + 1`
            None if metadata.value_map(op.symbol()).is_some() => {
                Ok(value_as_predicate(compile_value(expr, metadata)?))
            }
            None => metadata
                .require_filter(op.symbol(), expr)?
                .create_predicate(expr, metadata),
        },
        Expr::Between { .. } => metadata
            .require_filter("between", expr)?
            .create_predicate(expr, metadata),
        Expr::InList { .. } => metadata
            .require_filter("in", expr)?
            .create_predicate(expr, metadata),
        Expr::IsNull { .. } => metadata
            .require_filter("is_null", expr)?
            .create_predicate(expr, metadata),
        Expr::IsBoolean { .. } => metadata
            .require_filter("is_boolean", expr)?
            .create_predicate(expr, metadata),
        Expr::Function(call) => match metadata.filter(&call.name) {
            Some(feature) => feature.create_predicate(expr, metadata),
            None => Ok(value_as_predicate(compile_value(expr, metadata)?)),
        },
        _ => Ok(value_as_predicate(compile_value(expr, metadata)?)),
    }
}

fn negate(inner: RowPredicate) -> RowPredicate {
    Arc::new(move |ctx: &EvalContext, row: &Value| {
        let test = inner(ctx, row);
        async move { Ok(!test.await?) }.boxed()
    })
}

fn conjunction(left: RowPredicate, right: RowPredicate) -> RowPredicate {
    Arc::new(move |ctx: &EvalContext, row: &Value| {
        let ctx = bind(ctx, row);
        let first = left(&ctx, ctx.row());
        let right = right.clone();
        async move {
            if !first.await? {
                return Ok(false);
            }
            right(&ctx, ctx.row()).await
        }
        .boxed()
    })
}

fn disjunction(left: RowPredicate, right: RowPredicate) -> RowPredicate {
    Arc::new(move |ctx: &EvalContext, row: &Value| {
        let ctx = bind(ctx, row);
        let first = left(&ctx, ctx.row());
        let right = right.clone();
        async move {
            if first.await? {
                return Ok(true);
            }
            right(&ctx, ctx.row()).await
        }
        .boxed()
    })
}
