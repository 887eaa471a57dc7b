//! Join engine.
//!
//! Both sides are materialized before joining. A joined row is a record holding each
//! source's row under the source's alias (`{t1: {..}, t2: {..}}`), which is what
//! qualified column references such as `t2.name` resolve against. Multi-source
//! `from` clauses join pairwise from left to right.

mod nested;

use crate::ast::JoinKind;
use crate::compiler::RowPredicate;
use crate::context::EvalContext;
use crate::feature::{Feature, FeatureId, FeatureRegistry, JoinFeature};
use futures::future::BoxFuture;
use futures::FutureExt;
use rivulet_core::{Record, Result, Value};

/// The two materialized sides of one join step.
#[derive(Clone, Debug, Default)]
pub struct JoinInput {
    /// Rows joined so far, each a record keyed by source alias.
    pub left: Vec<Value>,
    /// Aliases present in every left row.
    pub left_aliases: Vec<String>,
    /// Raw rows of the source being joined.
    pub right: Vec<Value>,
    pub right_alias: String,
}

/// Wraps the rows of the first source under its alias.
pub fn qualify(alias: &str, rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter()
        .map(|row| Value::Record(Record::new().with(alias, row)))
        .collect()
}

/// Nested loop join of one kind.
struct NestedLoopJoin(JoinKind);

impl JoinFeature for NestedLoopJoin {
    fn join(
        &self,
        input: JoinInput,
        on: Option<RowPredicate>,
        ctx: EvalContext,
    ) -> BoxFuture<'static, Result<Vec<Value>>> {
        nested::nested_loop(self.0, input, on, ctx).boxed()
    }
}

pub fn register_defaults(registry: &mut FeatureRegistry) {
    for kind in [JoinKind::Inner, JoinKind::Left, JoinKind::Right, JoinKind::Cross] {
        registry.register(FeatureId::join(kind), Feature::join(NestedLoopJoin(kind)));
    }
}
