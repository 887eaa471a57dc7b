//! The aggregation engine's compile side.
//!
//! An `agg:` feature turns a call such as `avg(temp)` into an `AggregateSpec`: the
//! compiled operand plus a factory for fresh accumulators. `AggregateSet` collects
//! the aggregate calls of a statement and installs scoped `value-map:` features that
//! read each call's result from the flushed group, so the select list, `having`
//! and any arithmetic around aggregates compile through the ordinary expression
//! compiler.

use crate::ast::{CaseExpr, Expr, FunctionCall, Literal};
use crate::compiler::{compile_value, ValueMapper};
use crate::context::EvalContext;
use crate::feature::{
    AggregationFeature, Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature,
};
use futures::future;
use futures::FutureExt;
use rivulet_core::{Error, Result, Value};
use rivulet_incremental::{
    Accumulator, IncrementalAvg, IncrementalCount, IncrementalCountDistinct, IncrementalGeoMean,
    IncrementalMax, IncrementalMin, IncrementalStdDev, IncrementalSum,
};
use std::sync::Arc;

pub type AccumulatorFactory = Arc<dyn Fn() -> Box<dyn Accumulator> + Send + Sync>;

/// A compiled aggregate call.
#[derive(Clone)]
pub struct AggregateSpec {
    /// Operand fed to the accumulator; `None` feeds null for every record.
    pub argument: Option<ValueMapper>,
    pub factory: AccumulatorFactory,
}

impl AggregateSpec {
    pub fn new(
        argument: Option<ValueMapper>,
        factory: impl Fn() -> Box<dyn Accumulator> + Send + Sync + 'static,
    ) -> Self {
        Self {
            argument,
            factory: Arc::new(factory),
        }
    }

    pub fn accumulator(&self) -> Box<dyn Accumulator> {
        (self.factory)()
    }

    /// Evaluates the operand for the record `ctx` is positioned on.
    pub async fn operand(&self, ctx: &EvalContext) -> Result<Value> {
        match &self.argument {
            Some(argument) => argument(ctx).await,
            None => Ok(Value::Null),
        }
    }
}

fn single_argument<'a>(call: &'a FunctionCall) -> Result<&'a Expr> {
    match call.args.as_slice() {
        [arg] if !call.star => Ok(arg),
        args => Err(Error::arity(call.to_string(), "1", args.len())),
    }
}

/// `count(*)`, `count(1)`, `count(x)`, `count(distinct x)`.
struct Count;

impl AggregationFeature for Count {
    fn create_aggregate(&self, call: &FunctionCall, metadata: &QueryMetadata) -> Result<AggregateSpec> {
        if call.star {
            return Ok(AggregateSpec::new(None, || boxed(IncrementalCount::rows())));
        }
        let arg = single_argument(call)?;
        if call.distinct {
            let argument = compile_value(arg, metadata)?;
            return Ok(AggregateSpec::new(Some(argument), || boxed(IncrementalCountDistinct::new())));
        }
        match arg {
            Expr::Literal(literal) if *literal != Literal::Null => {
                Ok(AggregateSpec::new(None, || boxed(IncrementalCount::rows())))
            }
            arg => {
                let argument = compile_value(arg, metadata)?;
                Ok(AggregateSpec::new(Some(argument), || boxed(IncrementalCount::non_null())))
            }
        }
    }
}

/// A single-operand aggregate without `distinct` support.
struct Simple {
    name: &'static str,
    factory: fn() -> Box<dyn Accumulator>,
}

impl AggregationFeature for Simple {
    fn create_aggregate(&self, call: &FunctionCall, metadata: &QueryMetadata) -> Result<AggregateSpec> {
        if call.distinct {
            return Err(Error::unsupported_feature(
                format!("{} distinct", FeatureId::aggregation(self.name)),
                call.to_string(),
            ));
        }
        let argument = compile_value(single_argument(call)?, metadata)?;
        Ok(AggregateSpec::new(Some(argument), self.factory))
    }
}

fn boxed(accumulator: impl Accumulator + 'static) -> Box<dyn Accumulator> {
    Box::new(accumulator)
}

pub fn register_defaults(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::aggregation("count"), Feature::aggregation(Count));
    let simple: [(&'static str, fn() -> Box<dyn Accumulator>); 6] = [
        ("sum", || boxed(IncrementalSum::new())),
        ("avg", || boxed(IncrementalAvg::new())),
        ("max", || boxed(IncrementalMax::new())),
        ("min", || boxed(IncrementalMin::new())),
        ("stddev", || boxed(IncrementalStdDev::new())),
        ("geomean", || boxed(IncrementalGeoMean::new())),
    ];
    for (name, factory) in simple {
        registry.register(FeatureId::aggregation(name), Feature::aggregation(Simple { name, factory }));
    }
}

/// The distinct aggregate calls of one statement, in order of first appearance.
#[derive(Clone, Default)]
pub struct AggregateSet {
    calls: Arc<Vec<FunctionCall>>,
    specs: Vec<AggregateSpec>,
}

impl AggregateSet {
    /// Collects and compiles every aggregate call in `exprs`.
    ///
    /// Sub-selects are not searched; they aggregate on their own.
    pub fn collect<'a>(
        exprs: impl IntoIterator<Item = &'a Expr>,
        metadata: &QueryMetadata,
    ) -> Result<Self> {
        let mut calls = Vec::new();
        for expr in exprs {
            find_aggregates(expr, metadata, &mut calls);
        }
        let specs = calls
            .iter()
            .map(|call| {
                let feature = metadata.aggregation(&call.name).ok_or_else(|| {
                    Error::unsupported_feature(FeatureId::aggregation(&call.name).to_string(), call.to_string())
                })?;
                feature.create_aggregate(call, metadata)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            calls: Arc::new(calls),
            specs,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn specs(&self) -> &[AggregateSpec] {
        &self.specs
    }

    /// Metadata in which each collected call reads its slot of the current group.
    pub fn scope(&self, metadata: &QueryMetadata) -> QueryMetadata {
        let mut scoped = metadata.clone();
        let mut names: Vec<&str> = self.calls.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        for name in names {
            let slot = AggregateSlot {
                calls: self.calls.clone(),
            };
            scoped = scoped.with_scoped_feature(FeatureId::value_map(name), Feature::value_map(slot));
        }
        scoped
    }
}

fn find_aggregates(expr: &Expr, metadata: &QueryMetadata, found: &mut Vec<FunctionCall>) {
    if let Expr::Function(call) = expr {
        if metadata.aggregation(&call.name).is_some() {
            if !found.contains(call) {
                found.push(call.clone());
            }
            return;
        }
    }
    for child in children(expr) {
        find_aggregates(child, metadata, found);
    }
}

fn children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Literal(_) | Expr::Column(_) | Expr::SubQuery(_) => Vec::new(),
        Expr::Function(call) => call.args.iter().collect(),
        Expr::Binary { left, right, .. } => vec![&**left, &**right],
        Expr::Signed { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::Parenthesis(expr)
        | Expr::Not(expr)
        | Expr::IsNull { expr, .. }
        | Expr::IsBoolean { expr, .. } => vec![&**expr],
        Expr::Between { expr, low, high, .. } => vec![&**expr, &**low, &**high],
        Expr::InList { expr, list, .. } => std::iter::once(&**expr).chain(list).collect(),
        Expr::Case(CaseExpr {
            operand,
            branches,
            else_result,
        }) => operand
            .as_deref()
            .into_iter()
            .chain(branches.iter().flat_map(|(when, then)| [when, then]))
            .chain(else_result.as_deref())
            .collect(),
    }
}

/// Reads the result of one collected aggregate call.
struct AggregateSlot {
    calls: Arc<Vec<FunctionCall>>,
}

impl ValueMapFeature for AggregateSlot {
    fn create_mapper(&self, expr: &Expr, _metadata: &QueryMetadata) -> Result<ValueMapper> {
        let index = expr
            .as_function()
            .and_then(|call| self.calls.iter().position(|c| c == call))
            .ok_or_else(|| Error::unsupported_expression(expr.to_string()))?;
        Ok(Arc::new(move |ctx: &EvalContext| {
            future::ready(Ok(ctx.aggregate(index).cloned().unwrap_or(Value::Null))).boxed()
        }))
    }
}
