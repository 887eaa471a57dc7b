//! Expression and predicate compilation.
//!
//! Compilation turns an AST node into a reusable closure once; executing a plan only
//! invokes closures. Both closure kinds return boxed futures so that any node may
//! suspend (sub-selects, asynchronous column resolution) without blocking.

mod predicate;
mod value;

pub use predicate::compile_predicate;
pub use value::compile_value;

use crate::ast::Expr;
use crate::context::EvalContext;
use crate::feature::QueryMetadata;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

pub type ValueFuture = BoxFuture<'static, Result<Value>>;

/// Compiled value expression.
pub type ValueMapper = Arc<dyn Fn(&EvalContext) -> ValueFuture + Send + Sync>;

pub type BoolFuture = BoxFuture<'static, Result<bool>>;

/// Compiled boolean expression over `(context, record)`.
pub type RowPredicate = Arc<dyn Fn(&EvalContext, &Value) -> BoolFuture + Send + Sync>;

/// A mapper ignoring its context.
pub fn constant(value: Value) -> ValueMapper {
    Arc::new(move |_ctx: &EvalContext| future::ready(Ok(value.clone())).boxed())
}

/// Context positioned on `row`, reusing `ctx` when it already is.
pub(crate) fn bind(ctx: &EvalContext, row: &Value) -> EvalContext {
    if std::ptr::eq(ctx.row(), row) {
        ctx.clone()
    } else {
        ctx.with_row(row.clone())
    }
}

/// Wraps a predicate so it can appear in value position.
pub fn predicate_as_value(predicate: RowPredicate) -> ValueMapper {
    Arc::new(move |ctx: &EvalContext| {
        let test = predicate(ctx, ctx.row());
        async move { test.await.map(Value::Boolean) }.boxed()
    })
}

/// Wraps a value mapper so it can appear in predicate position.
pub fn value_as_predicate(mapper: ValueMapper) -> RowPredicate {
    Arc::new(move |ctx: &EvalContext, row: &Value| {
        let eval = mapper(&bind(ctx, row));
        async move { Ok(eval.await?.is_truthy()) }.boxed()
    })
}

/// The two operands of a binary operator or of a two-argument function call.
///
/// Fails with `ArityError` when a call does not have exactly two arguments.
pub fn binary_operands(expr: &Expr) -> Result<(&Expr, &Expr)> {
    match expr {
        Expr::Binary { left, right, .. } => Ok((left.as_ref(), right.as_ref())),
        Expr::Function(call) => match call.args.as_slice() {
            [left, right] => Ok((left, right)),
            args => Err(Error::arity(expr.to_string(), "2", args.len())),
        },
        _ => Err(Error::unsupported_expression(expr.to_string())),
    }
}

/// Compiles both operands of `expr`, see `binary_operands`.
pub fn compile_binary(expr: &Expr, metadata: &QueryMetadata) -> Result<(ValueMapper, ValueMapper)> {
    let (left, right) = binary_operands(expr)?;
    Ok((compile_value(left, metadata)?, compile_value(right, metadata)?))
}

pub fn compile_all(exprs: &[Expr], metadata: &QueryMetadata) -> Result<Vec<ValueMapper>> {
    exprs.iter().map(|e| compile_value(e, metadata)).collect()
}

/// Evaluates every mapper against `ctx`, in order.
pub fn eval_all(mappers: &[ValueMapper], ctx: &EvalContext) -> BoxFuture<'static, Result<Vec<Value>>> {
    let pending: Vec<ValueFuture> = mappers.iter().map(|m| m(ctx)).collect();
    future::try_join_all(pending).boxed()
}

/// Evaluates a pair of operand mappers.
pub fn eval_pair(
    left: &ValueMapper,
    right: &ValueMapper,
    ctx: &EvalContext,
) -> BoxFuture<'static, Result<(Value, Value)>> {
    future::try_join(left(ctx), right(ctx)).boxed()
}
