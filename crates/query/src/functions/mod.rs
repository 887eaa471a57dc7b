//! Built-in value-map, filter and cast features.
//!
//! Most functions are plain `&[Value] -> Value` computations. `ScalarFunction` wraps
//! one with an arity check and operand compilation, so a family module only states
//! the computation. Features that need the AST (`property`, `select`, `case-when`,
//! `cast`) or the settings (`now`, `date_format`) implement `ValueMapFeature`
//! directly.

mod arithmetic;
mod bitwise;
mod case_when;
mod cast;
mod collection;
mod comparison;
mod date;
mod property;
mod select;
mod string;

pub use cast::TypeCast;
pub use property::resolve_column;

use crate::ast::Expr;
use crate::compiler::{compile_value, eval_all, ValueMapper};
use crate::context::EvalContext;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use futures::FutureExt;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

/// Accepted operand counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }

    /// Fails with `ArityError` naming `expr` when `count` is not accepted.
    pub fn check(&self, expr: &Expr, count: usize) -> Result<()> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(Error::arity(expr.to_string(), self.to_string(), count))
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{}..={}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// The operands of a call or a binary operator.
pub fn operands(expr: &Expr) -> Result<Vec<&Expr>> {
    match expr {
        Expr::Function(call) => Ok(call.args.iter().collect()),
        Expr::Binary { left, right, .. } => Ok(vec![left.as_ref(), right.as_ref()]),
        Expr::Signed { expr: operand, .. } => Ok(vec![operand.as_ref()]),
        _ => Err(Error::unsupported_expression(expr.to_string())),
    }
}

/// Checks `arity` and compiles every operand of `expr`.
pub fn compile_operands(expr: &Expr, arity: Arity, metadata: &QueryMetadata) -> Result<Vec<ValueMapper>> {
    let args = operands(expr)?;
    arity.check(expr, args.len())?;
    args.into_iter().map(|arg| compile_value(arg, metadata)).collect()
}

pub type ApplyFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Mapper evaluating `mappers` and handing the results to `apply`.
pub fn map_values(mappers: Vec<ValueMapper>, apply: Arc<ApplyFn>) -> ValueMapper {
    Arc::new(move |ctx: &EvalContext| {
        let pending = eval_all(&mappers, ctx);
        let apply = apply.clone();
        async move { apply(&pending.await?) }.boxed()
    })
}

/// A function over already evaluated operands.
#[derive(Clone)]
pub struct ScalarFunction {
    arity: Arity,
    apply: Arc<ApplyFn>,
}

impl ScalarFunction {
    pub fn new(arity: Arity, apply: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            arity,
            apply: Arc::new(apply),
        }
    }
}

impl ValueMapFeature for ScalarFunction {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let mappers = compile_operands(expr, self.arity, metadata)?;
        Ok(map_values(mappers, self.apply.clone()))
    }
}

pub(crate) fn register_scalar(
    registry: &mut FeatureRegistry,
    names: &[&str],
    arity: Arity,
    apply: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
) {
    let function = ScalarFunction::new(arity, apply);
    for name in names {
        registry.register(FeatureId::value_map(name), Feature::value_map(function.clone()));
    }
}

/// Installs every built-in value-map, filter and cast feature.
pub fn register_defaults(registry: &mut FeatureRegistry) {
    property::register(registry);
    select::register(registry);
    case_when::register(registry);
    cast::register(registry);
    arithmetic::register(registry);
    bitwise::register(registry);
    string::register(registry);
    collection::register(registry);
    date::register(registry);
    comparison::register(registry);
}
