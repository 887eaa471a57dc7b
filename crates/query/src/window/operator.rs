//! The grouping event loop.
//!
//! One loop per execution owns every open window instance. Each turn it waits for
//! whichever comes first, the next record or the end of the oldest open time window,
//! so accumulator updates and flushes never overlap. Keys, operands and window
//! predicates are evaluated, and operands checked against every aggregate, before any
//! window is touched; a record rejected under `ErrorPolicy::Skip` leaves no trace.

use super::table::{GroupRow, GroupTable};
use super::WindowSpec;
use crate::aggregate::AggregateSpec;
use crate::compiler::{eval_all, ValueMapper};
use crate::context::{EvalContext, RecordStream};
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, trace, warn};
use rivulet_core::{Error, Result, Value};
use rivulet_incremental::Accumulator;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Compiled `group by` clause plus the statement's aggregates.
pub struct GroupPlan {
    pub keys: Vec<ValueMapper>,
    pub window: Option<WindowSpec>,
    pub aggregates: Vec<AggregateSpec>,
}

impl GroupPlan {
    /// No keys and no window: the whole input is one group.
    fn is_global(&self) -> bool {
        self.keys.is_empty() && self.window.is_none()
    }
}

/// Groups `input`, emitting one row per (window instance, key) on flush.
///
/// Source errors and `GroupLimit` end the stream after being emitted; evaluation
/// errors follow the context's error policy.
pub fn group_stream(input: RecordStream, plan: Arc<GroupPlan>, ctx: EvalContext) -> BoxStream<'static, Result<GroupRow>> {
    if let Some(WindowSpec::Time { size, slide }) = &plan.window {
        if slide > size {
            warn!(
                "window slide {:?} exceeds its size {:?}; records between windows are dropped",
                slide, size
            );
        }
    }
    let validators = plan.aggregates.iter().map(AggregateSpec::accumulator).collect();
    let state = GroupState {
        input,
        plan,
        ctx,
        validators,
        open: BTreeMap::new(),
        output: VecDeque::new(),
        started: None,
        seen: 0,
        current: 0,
        triggered: false,
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.output.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            state.step().await;
        }
    })
    .boxed()
}

enum Event {
    Tick,
    Record(Option<Result<Value>>),
}

/// What one record contributes once evaluated.
struct Evaluated {
    key: Vec<Value>,
    operands: Vec<Value>,
    predicate_holds: bool,
}

struct GroupState {
    input: RecordStream,
    plan: Arc<GroupPlan>,
    ctx: EvalContext,
    /// One fresh accumulator per aggregate, only ever asked to `check`.
    validators: Vec<Box<dyn Accumulator>>,
    /// Open window instances by id.
    open: BTreeMap<u64, GroupTable>,
    output: VecDeque<Result<GroupRow>>,
    started: Option<Instant>,
    /// Records accepted so far; positions records in count windows.
    seen: u64,
    /// Id of the open predicate window.
    current: u64,
    /// Window predicate result of the previous accepted record.
    triggered: bool,
    finished: bool,
}

impl GroupState {
    async fn step(&mut self) {
        let started = *self.started.get_or_insert_with(|| self.ctx.scheduler().now());
        let event = match self.next_deadline(started) {
            Some(deadline) => {
                let sleep = self.ctx.scheduler().sleep_until(deadline);
                tokio::select! {
                    biased;
                    _ = sleep => Event::Tick,
                    item = self.input.next() => Event::Record(item),
                }
            }
            None => Event::Record(self.input.next().await),
        };
        match event {
            Event::Tick => self.flush_expired(started),
            Event::Record(Some(Ok(row))) => self.accept(row, started).await,
            Event::Record(Some(Err(err))) => self.fail(err),
            Event::Record(None) => self.complete(),
        }
    }

    /// End of the oldest open time window.
    fn next_deadline(&self, started: Instant) -> Option<Instant> {
        let Some(WindowSpec::Time { size, slide }) = &self.plan.window else {
            return None;
        };
        let (&id, _) = self.open.first_key_value()?;
        Some(started + Duration::from_millis(time_window_end(id, *size, *slide)))
    }

    fn elapsed_millis(&self, started: Instant) -> u64 {
        let elapsed = self.ctx.scheduler().now().saturating_duration_since(started);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    fn flush_expired(&mut self, started: Instant) {
        let Some(WindowSpec::Time { size, slide }) = self.plan.window.clone() else {
            return;
        };
        let elapsed = self.elapsed_millis(started);
        while let Some((&id, _)) = self.open.first_key_value() {
            if time_window_end(id, size, slide) > elapsed {
                break;
            }
            self.flush_first();
        }
    }

    /// Ids of the window instances a new record belongs to.
    fn assign(&self, started: Instant) -> Vec<u64> {
        match &self.plan.window {
            None => vec![0],
            Some(WindowSpec::Predicate(_)) => vec![self.current],
            Some(WindowSpec::Count { size, skip }) => covering(self.seen, *size, *skip),
            Some(WindowSpec::Time { size, slide }) => {
                covering(self.elapsed_millis(started), millis(*size), millis(*slide))
            }
        }
    }

    async fn accept(&mut self, row: Value, started: Instant) {
        self.flush_expired(started);
        let evaluated = match evaluate(self.plan.clone(), self.ctx.with_row(row.clone())).await {
            Ok(evaluated) => evaluated,
            Err(err) => return self.reject(err),
        };
        let ids = self.assign(started);
        if ids.is_empty() {
            trace!("record falls between window instances");
        }
        if let Err(err) = self.admit(&evaluated, &ids) {
            return self.reject(err);
        }
        let max_groups = self.ctx.settings().max_groups;
        for id in ids {
            let table = self.open.entry(id).or_insert_with(|| {
                debug!("opened window {}", id);
                GroupTable::new()
            });
            let updated = table.update(
                &evaluated.key,
                &row,
                &evaluated.operands,
                &self.plan.aggregates,
                max_groups,
            );
            if let Err(err) = updated {
                return self.reject(err);
            }
        }
        self.seen += 1;
        match self.plan.window.clone() {
            Some(WindowSpec::Count { size, skip }) => {
                while let Some((&id, _)) = self.open.first_key_value() {
                    if id * skip + size > self.seen {
                        break;
                    }
                    self.flush_first();
                }
            }
            Some(WindowSpec::Predicate(_)) => {
                let rising = evaluated.predicate_holds && !self.triggered;
                self.triggered = evaluated.predicate_holds;
                if rising {
                    self.flush_first();
                    self.current += 1;
                }
            }
            _ => {}
        }
    }

    /// Fails if merging `evaluated` into the windows `ids` would fail part way.
    fn admit(&self, evaluated: &Evaluated, ids: &[u64]) -> Result<()> {
        for (validator, operand) in self.validators.iter().zip(&evaluated.operands) {
            validator.check(operand)?;
        }
        let max_groups = self.ctx.settings().max_groups;
        for id in ids {
            match self.open.get(id) {
                Some(table) => table.admits(&evaluated.key, max_groups)?,
                None => GroupTable::new().admits(&evaluated.key, max_groups)?,
            }
        }
        Ok(())
    }

    fn reject(&mut self, err: Error) {
        if self.ctx.settings().error_policy.skips(&err) {
            warn!("skipping record: {}", err);
        } else {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: Error) {
        self.open.clear();
        self.output.push_back(Err(err));
        self.finished = true;
    }

    fn flush_first(&mut self) {
        if let Some((id, table)) = self.open.pop_first() {
            trace!("flushing window {} with {} group(s)", id, table.len());
            self.output.extend(table.finish().into_iter().map(Ok));
        }
    }

    fn complete(&mut self) {
        if self.plan.is_global() && self.open.is_empty() {
            let aggregates = self.plan.aggregates.iter().map(|spec| spec.accumulator().finish()).collect();
            self.output.push_back(Ok(GroupRow {
                sample: Value::Null,
                aggregates,
            }));
        }
        while !self.open.is_empty() {
            self.flush_first();
        }
        self.finished = true;
    }
}

async fn evaluate(plan: Arc<GroupPlan>, ctx: EvalContext) -> Result<Evaluated> {
    let key = eval_all(&plan.keys, &ctx).await?;
    let mut operands = Vec::with_capacity(plan.aggregates.len());
    for spec in &plan.aggregates {
        operands.push(spec.operand(&ctx).await?);
    }
    let predicate_holds = match &plan.window {
        Some(WindowSpec::Predicate(predicate)) => predicate(&ctx, ctx.row()).await?,
        _ => false,
    };
    Ok(Evaluated {
        key: key.into_iter().map(Value::normalized).collect(),
        operands,
        predicate_holds,
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn time_window_end(id: u64, size: Duration, slide: Duration) -> u64 {
    id.saturating_mul(millis(slide)).saturating_add(millis(size))
}

/// Ids `j` with `j * step <= position < j * step + size`.
fn covering(position: u64, size: u64, step: u64) -> Vec<u64> {
    let last = position / step;
    let first = if position >= size { (position - size) / step + 1 } else { 0 };
    (first..=last).collect()
}
