//! Stream stages shared by the pipeline.

use crate::ast::{Limit, SortOrder};
use crate::settings::ErrorPolicy;
use core::cmp::Ordering;
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use hashbrown::HashSet;
use log::warn;
use rivulet_core::{Result, Value};

/// A projected row with its evaluated `order by` keys.
#[derive(Clone, Debug)]
pub(crate) struct Shaped {
    pub row: Value,
    pub keys: Vec<Value>,
}

/// Runs `step` on every item, emitting what it returns.
///
/// `Ok(None)` drops the item. A failing step follows `policy`; an upstream error is
/// emitted and ends the stage without polling the input again.
pub(crate) fn stage<T, O, F>(
    input: BoxStream<'static, Result<T>>,
    policy: ErrorPolicy,
    step: F,
) -> BoxStream<'static, Result<O>>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T) -> BoxFuture<'static, Result<Option<O>>> + Send + 'static,
{
    stream::unfold(Some((input, step)), move |state| async move {
        let Some((mut input, step)) = state else {
            return None;
        };
        loop {
            let item = match input.next().await {
                Some(Ok(item)) => item,
                Some(Err(err)) => return Some((Err(err), None)),
                None => return None,
            };
            match step(item).await {
                Ok(Some(out)) => return Some((Ok(out), Some((input, step)))),
                Ok(None) => {}
                Err(err) if policy.skips(&err) => warn!("skipping record: {}", err),
                Err(err) => return Some((Err(err), None)),
            }
        }
    })
    .boxed()
}

/// Drops rows equal to an earlier row.
pub(crate) fn distinct(input: BoxStream<'static, Result<Shaped>>) -> BoxStream<'static, Result<Shaped>> {
    let mut seen = HashSet::new();
    input
        .filter(move |item| {
            future::ready(match item {
                Ok(shaped) => seen.insert(shaped.row.clone().normalized()),
                Err(_) => true,
            })
        })
        .boxed()
}

/// Buffers the input and emits it sorted by key, keeping arrival order for ties.
pub(crate) fn order_by(
    mut input: BoxStream<'static, Result<Shaped>>,
    orders: Vec<SortOrder>,
) -> BoxStream<'static, Result<Shaped>> {
    stream::once(async move {
        let mut rows = Vec::new();
        while let Some(item) = input.next().await {
            match item {
                Ok(shaped) => rows.push(shaped),
                Err(err) => return stream::iter(vec![Err(err)]),
            }
        }
        rows.sort_by(|a, b| compare_keys(&a.keys, &b.keys, &orders));
        stream::iter(rows.into_iter().map(Ok).collect::<Vec<_>>())
    })
    .flatten()
    .boxed()
}

fn compare_keys(a: &[Value], b: &[Value], orders: &[SortOrder]) -> Ordering {
    for ((a, b), order) in a.iter().zip(b).zip(orders) {
        let ord = match order {
            SortOrder::Asc => a.cmp(b),
            SortOrder::Desc => b.cmp(a),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// `limit offset, count`: stops polling the input once `count` rows passed.
pub(crate) fn limit(input: BoxStream<'static, Result<Value>>, limit: Limit) -> BoxStream<'static, Result<Value>> {
    let offset = limit.offset;
    let skipped = input
        .scan(0u64, move |index, item| {
            let keep = item.is_err() || *index >= offset;
            if item.is_ok() {
                *index += 1;
            }
            future::ready(Some(keep.then_some(item)))
        })
        .filter_map(future::ready);
    match limit.count {
        Some(count) => skipped
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .boxed(),
        None => skipped.boxed(),
    }
}
