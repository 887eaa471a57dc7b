//! Rivulet Query - SQL-surfaced queries over asynchronous record streams.
//!
//! A parsed `select` statement is compiled once into an immutable [`Plan`]; running
//! the plan against bound data sources yields an asynchronous stream of output
//! records. This crate provides:
//!
//! - `ast`: select statement and expression trees, plus the `QueryParser` boundary
//! - `feature`: the registry of named capabilities and per-query overrides
//! - `compiler`: expression and predicate compilation into reusable closures
//! - `functions`: built-in value-map, filter and cast features
//! - `aggregate`: aggregate features and the per-statement aggregate set
//! - `window`: grouping, windows and the grouping event loop
//! - `join`: join features over materialized sources
//! - `executor`: pipeline assembly (`Plan`)
//! - `context`: execution context and data source bindings
//! - `plan_cache`: compiled plan caching for repeated query text
//! - `settings`, `scheduler`: per-query configuration and timers
//!
//! # Example
//!
//! ```rust
//! use futures::TryStreamExt;
//! use rivulet_core::{Record, Value};
//! use rivulet_query::ast::{Expr, SelectStatement};
//! use rivulet_query::{Plan, StaticSources};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rivulet_core::Result<()> {
//! let query = SelectStatement::new()
//!     .select(Expr::col("type"))
//!     .select_as(Expr::func("avg", vec![Expr::col("temp")]), "avg_temp")
//!     .from("sensors")
//!     .group_by(Expr::col("type"));
//! let plan = Plan::compile(&query)?;
//!
//! let sensors = StaticSources::new().with(
//!     "sensors",
//!     vec![
//!         Value::from(Record::new().with("type", "a").with("temp", 20i64)),
//!         Value::from(Record::new().with("type", "a").with("temp", 22i64)),
//!     ],
//! );
//! let rows: Vec<Value> = plan.run(Arc::new(sensors)).try_collect().await?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get_path("avg_temp"), Some(&Value::Float64(21.0)));
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod ast;
pub mod compiler;
pub mod context;
pub mod executor;
pub mod feature;
pub mod functions;
pub mod join;
pub mod plan_cache;
pub mod scheduler;
pub mod settings;
pub mod window;

pub use ast::{QueryParser, SelectStatement};
pub use context::{DataSource, EvalContext, RecordStream, SingleStream, StaticSources};
pub use executor::Plan;
pub use feature::{Feature, FeatureId, QueryMetadata};
pub use plan_cache::PlanCache;
pub use settings::{ErrorPolicy, QuerySettings};
