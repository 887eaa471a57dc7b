//! `from` and `join` sources.

use super::Plan;
use crate::ast::{FromItem, JoinKind, SelectStatement};
use crate::compiler::{compile_predicate, RowPredicate};
use crate::context::{EvalContext, RecordStream};
use crate::feature::{FeatureId, JoinFeature, QueryMetadata};
use crate::join::{qualify, JoinInput};
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

/// One source of a `from` clause.
#[derive(Clone)]
pub(crate) enum Input {
    Table(String),
    Query(Plan),
}

#[derive(Clone)]
pub(crate) struct Source {
    input: Input,
    alias: String,
}

impl Source {
    fn compile(item: &FromItem, position: usize, metadata: &QueryMetadata) -> Result<Self> {
        let input = match item {
            FromItem::Table { name, .. } => Input::Table(name.clone()),
            FromItem::SubQuery { query, .. } => Input::Query(Plan::compile_with(query, &metadata.nested())?),
        };
        let alias = item
            .qualifier()
            .map_or_else(|| format!("_{}", position), str::to_string);
        Ok(Self { input, alias })
    }

    fn open(&self, ctx: &EvalContext, nested: bool) -> RecordStream {
        match &self.input {
            Input::Table(name) => ctx
                .open(name)
                .unwrap_or_else(|err| stream::once(future::ready(Err(err))).boxed()),
            Input::Query(plan) => plan.stream(ctx.clone(), nested),
        }
    }

    async fn materialize(&self, ctx: &EvalContext, nested: bool) -> Result<Vec<Value>> {
        self.open(ctx, nested).try_collect().await
    }
}

pub(crate) struct JoinStep {
    source: Source,
    on: Option<RowPredicate>,
    feature: Arc<dyn JoinFeature>,
}

/// Where a statement's records come from.
pub(crate) enum SourcePlan {
    /// No `from`: the enclosing record, or the default source at top level.
    Implicit,
    Single(Source),
    Joined {
        first: Source,
        steps: Arc<[JoinStep]>,
    },
}

impl SourcePlan {
    pub fn compile(statement: &SelectStatement, metadata: &QueryMetadata) -> Result<Self> {
        let Some(from) = &statement.from else {
            return Ok(SourcePlan::Implicit);
        };
        let first = Source::compile(from, 0, metadata)?;
        if statement.joins.is_empty() {
            return Ok(SourcePlan::Single(first));
        }
        let mut steps = Vec::with_capacity(statement.joins.len());
        for (i, join) in statement.joins.iter().enumerate() {
            // `cross join .. on` behaves as an inner join
            let kind = match (join.kind, &join.on) {
                (JoinKind::Cross, Some(_)) => JoinKind::Inner,
                (kind, _) => kind,
            };
            let feature = metadata.join(kind).ok_or_else(|| {
                Error::unsupported_feature(FeatureId::join(kind).to_string(), statement.to_string())
            })?;
            steps.push(JoinStep {
                source: Source::compile(&join.source, i + 1, metadata)?,
                on: join.on.as_ref().map(|on| compile_predicate(on, metadata)).transpose()?,
                feature,
            });
        }
        Ok(SourcePlan::Joined {
            first,
            steps: steps.into(),
        })
    }

    /// Opens the records and the context they are evaluated in.
    pub fn open(&self, ctx: &EvalContext, nested: bool) -> (RecordStream, EvalContext) {
        match self {
            SourcePlan::Implicit if nested => {
                let row = ctx.row().clone();
                (stream::once(future::ready(Ok(row))).boxed(), ctx.clone())
            }
            SourcePlan::Implicit => {
                let name = ctx.settings().default_source.clone();
                let records = ctx
                    .open(&name)
                    .unwrap_or_else(|err| stream::once(future::ready(Err(err))).boxed());
                (records, ctx.clone())
            }
            SourcePlan::Single(source) => (source.open(ctx, nested), ctx.with_alias(Some(&source.alias))),
            SourcePlan::Joined { first, steps } => {
                let joined = join_all(first.clone(), steps.clone(), ctx.with_alias(None), nested);
                let records = stream::once(joined)
                    .map(|result| match result {
                        Ok(rows) => stream::iter(rows.into_iter().map(Ok)).boxed(),
                        Err(err) => stream::once(future::ready(Err(err))).boxed(),
                    })
                    .flatten()
                    .boxed();
                (records, ctx.with_alias(None))
            }
        }
    }
}

async fn join_all(first: Source, steps: Arc<[JoinStep]>, ctx: EvalContext, nested: bool) -> Result<Vec<Value>> {
    let mut left = qualify(&first.alias, first.materialize(&ctx, nested).await?);
    let mut left_aliases = vec![first.alias.clone()];
    for step in steps.iter() {
        let right = step.source.materialize(&ctx, nested).await?;
        let input = JoinInput {
            left,
            left_aliases: left_aliases.clone(),
            right,
            right_alias: step.source.alias.clone(),
        };
        left = step.feature.join(input, step.on.clone(), ctx.clone()).await?;
        left_aliases.push(step.source.alias.clone());
    }
    Ok(left)
}
