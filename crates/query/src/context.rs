//! Execution context and data source bindings.
//!
//! An `EvalContext` is handed to every compiled function. It carries the current
//! record, the alias of the source the record came from, the bound data sources
//! (for subqueries), the scheduler and the settings. Cloning is cheap: every field
//! is reference counted.

use crate::scheduler::{Scheduler, TokioScheduler};
use crate::settings::QuerySettings;
use futures::stream::{self, BoxStream, StreamExt};
use hashbrown::HashMap;
use parking_lot::Mutex;
use rivulet_core::{Error, Result, Value};
use std::fmt;
use std::sync::Arc;

/// An asynchronous sequence of records.
pub type RecordStream = BoxStream<'static, Result<Value>>;

/// Produces a record stream per source name.
///
/// The pipeline asks once per distinct source occurrence in `from`/`join`, and once
/// per record for sub-selects reading a named source.
pub trait DataSource: Send + Sync {
    fn open(&self, name: &str) -> Result<RecordStream>;
}

impl<F> DataSource for F
where
    F: Fn(&str) -> Result<RecordStream> + Send + Sync,
{
    fn open(&self, name: &str) -> Result<RecordStream> {
        self(name)
    }
}

/// Binds every source name to one stream, which can be opened only once.
pub struct SingleStream {
    stream: Mutex<Option<RecordStream>>,
}

impl SingleStream {
    pub fn new(stream: RecordStream) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl DataSource for SingleStream {
    fn open(&self, name: &str) -> Result<RecordStream> {
        self.stream
            .lock()
            .take()
            .ok_or_else(|| Error::source(name, "input stream already consumed"))
    }
}

/// In-memory, replayable sources keyed by name.
#[derive(Clone, Debug, Default)]
pub struct StaticSources {
    tables: HashMap<String, Arc<Vec<Value>>>,
}

impl StaticSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, records: impl IntoIterator<Item = Value>) -> Self {
        self.tables
            .insert(name.into(), Arc::new(records.into_iter().collect()));
        self
    }
}

impl DataSource for StaticSources {
    fn open(&self, name: &str) -> Result<RecordStream> {
        let records = self
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::source(name, "unknown source"))?;
        let len = records.len();
        Ok(stream::iter((0..len).map(move |i| Ok(records[i].clone()))).boxed())
    }
}

/// Per-execution state passed to compiled functions.
#[derive(Clone)]
pub struct EvalContext {
    row: Arc<Value>,
    alias: Option<Arc<str>>,
    aggregates: Option<Arc<[Value]>>,
    sources: Arc<dyn DataSource>,
    scheduler: Arc<dyn Scheduler>,
    settings: Arc<QuerySettings>,
}

impl EvalContext {
    /// Creates a context positioned on a null row.
    pub fn new(sources: Arc<dyn DataSource>, settings: Arc<QuerySettings>) -> Self {
        Self {
            row: Arc::new(Value::Null),
            alias: None,
            aggregates: None,
            sources,
            scheduler: Arc::new(TokioScheduler),
            settings,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The current record.
    #[inline]
    pub fn row(&self) -> &Value {
        &self.row
    }

    /// Same execution, positioned on `row`.
    pub fn with_row(&self, row: Value) -> Self {
        Self {
            row: Arc::new(row),
            ..self.clone()
        }
    }

    /// Same execution, records now attributed to source `alias`.
    pub fn with_alias(&self, alias: Option<&str>) -> Self {
        Self {
            alias: alias.map(Arc::from),
            ..self.clone()
        }
    }

    /// Alias of the single source the current record came from.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Same execution, positioned on a flushed group: `sample` is the group's first
    /// record and `aggregates` its aggregate results in slot order.
    pub fn with_group(&self, sample: Value, aggregates: Vec<Value>) -> Self {
        Self {
            row: Arc::new(sample),
            aggregates: Some(aggregates.into()),
            ..self.clone()
        }
    }

    /// Result of aggregate slot `index` of the current group.
    pub fn aggregate(&self, index: usize) -> Option<&Value> {
        self.aggregates.as_deref()?.get(index)
    }

    /// Opens a named source.
    pub fn open(&self, name: &str) -> Result<RecordStream> {
        log::debug!("opening source {}", name);
        self.sources.open(name)
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("row", &self.row)
            .field("alias", &self.alias)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_single_stream_opens_once() {
        let source = SingleStream::new(stream::iter(vec![Ok(Value::Int64(1))]).boxed());
        let records: Vec<Value> = source.open("a").unwrap().try_collect().await.unwrap();
        assert_eq!(records, vec![Value::Int64(1)]);
        assert!(matches!(source.open("b"), Err(Error::Source { .. })));
    }

    #[tokio::test]
    async fn test_static_sources_replay() {
        let sources = StaticSources::new().with("t", vec![Value::Int64(1), Value::Int64(2)]);
        for _ in 0..2 {
            let records: Vec<Value> = sources.open("t").unwrap().try_collect().await.unwrap();
            assert_eq!(records.len(), 2);
        }
        assert!(sources.open("missing").is_err());
    }

    #[tokio::test]
    async fn test_closure_source() {
        let source = |name: &str| -> Result<RecordStream> {
            Ok(stream::iter(vec![Ok(Value::from(format!("t_{}", name)))]).boxed())
        };
        let records: Vec<Value> = source.open("a").unwrap().try_collect().await.unwrap();
        assert_eq!(records, vec![Value::from("t_a")]);
    }

    #[test]
    fn test_context_rebinding() {
        let ctx = EvalContext::new(Arc::new(StaticSources::new()), Arc::new(QuerySettings::default()));
        let bound = ctx.with_row(Value::Int64(3)).with_alias(Some("t"));
        assert_eq!(bound.row(), &Value::Int64(3));
        assert_eq!(bound.alias(), Some("t"));
        assert_eq!(ctx.row(), &Value::Null);

        let group = bound.with_group(Value::Int64(4), vec![Value::Int64(2)]);
        assert_eq!(group.aggregate(0), Some(&Value::Int64(2)));
        assert_eq!(group.aggregate(1), None);
        assert_eq!(group.alias(), Some("t"));
    }
}
