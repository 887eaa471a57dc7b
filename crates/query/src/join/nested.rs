//! Nested loop join over materialized sides.

use super::JoinInput;
use crate::ast::JoinKind;
use crate::compiler::RowPredicate;
use crate::context::EvalContext;
use log::trace;
use rivulet_core::{Record, Result, Value};

/// Executes a nested loop join.
///
/// Every pair is combined into one record and tested with `on`; a missing
/// predicate accepts every pair. Outer joins pad the unmatched side with nulls.
pub(super) async fn nested_loop(
    kind: JoinKind,
    input: JoinInput,
    on: Option<RowPredicate>,
    ctx: EvalContext,
) -> Result<Vec<Value>> {
    trace!(
        "{} join: {} x {} rows",
        kind.name(),
        input.left.len(),
        input.right.len()
    );
    let mut joined = Vec::new();
    match kind {
        JoinKind::Inner | JoinKind::Cross | JoinKind::Left => {
            for left in &input.left {
                let mut matched = false;
                for right in &input.right {
                    let combined = input.combine(left, right.clone());
                    if accepts(&on, &ctx, &combined).await? {
                        matched = true;
                        joined.push(combined);
                    }
                }
                if !matched && kind == JoinKind::Left {
                    joined.push(input.combine(left, Value::Null));
                }
            }
        }
        JoinKind::Right => {
            let padding = input.null_left();
            for right in &input.right {
                let mut matched = false;
                for left in &input.left {
                    let combined = input.combine(left, right.clone());
                    if accepts(&on, &ctx, &combined).await? {
                        matched = true;
                        joined.push(combined);
                    }
                }
                if !matched {
                    joined.push(input.combine(&padding, right.clone()));
                }
            }
        }
    }
    Ok(joined)
}

async fn accepts(on: &Option<RowPredicate>, ctx: &EvalContext, combined: &Value) -> Result<bool> {
    match on {
        Some(predicate) => predicate(ctx, combined).await,
        None => Ok(true),
    }
}

impl JoinInput {
    /// `left` with the right-side row added under its alias.
    fn combine(&self, left: &Value, right: Value) -> Value {
        let mut record = match left {
            Value::Record(record) => record.clone(),
            _ => Record::new(),
        };
        record.insert(self.right_alias.clone(), right);
        Value::Record(record)
    }

    /// A left-side record whose every source is null.
    fn null_left(&self) -> Value {
        Value::Record(
            self.left_aliases
                .iter()
                .map(|alias| (alias.clone(), Value::Null))
                .collect(),
        )
    }
}
