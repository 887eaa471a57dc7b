//! `value-map:select`: a sub-select in value position.

use crate::ast::{Expr, SelectItem, SelectStatement};
use crate::compiler::ValueMapper;
use crate::context::EvalContext;
use crate::executor::Plan;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use futures::{FutureExt, StreamExt};
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

/// Output key of a statement selecting exactly one non-wildcard item.
fn single_column(query: &SelectStatement) -> Option<String> {
    match query.items.as_slice() {
        [item @ SelectItem::Expr { .. }] => Some(item.output_name()),
        _ => None,
    }
}

struct SubSelect;

impl ValueMapFeature for SubSelect {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let Expr::SubQuery(query) = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let plan = Plan::compile_with(query, &metadata.nested())?;
        let column: Option<Arc<str>> = single_column(query).map(Arc::from);
        Ok(Arc::new(move |ctx: &EvalContext| {
            let mut rows = plan.run_in(ctx);
            let column = column.clone();
            async move {
                // only the first row is needed; dropping the stream cancels the rest
                let first = match rows.next().await {
                    Some(row) => row?,
                    None => return Ok(Value::Null),
                };
                Ok(match (column, first) {
                    (Some(column), Value::Record(mut record)) => {
                        record.remove(&column).unwrap_or(Value::Null)
                    }
                    (_, row) => row,
                })
            }
            .boxed()
        }))
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("select"), Feature::value_map(SubSelect));
}
