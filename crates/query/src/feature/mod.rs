//! Feature identifiers and capability traits.
//!
//! A feature is a stateless compiler for one syntax capability. Features are resolved
//! by `FeatureId` (category + lowercase name) once, while a plan is compiled; the
//! functions they return are what runs per record.

mod metadata;
mod registry;

pub use metadata::QueryMetadata;
pub use registry::{global, register_global, FeatureRegistry};

use crate::aggregate::AggregateSpec;
use crate::ast::{Expr, FunctionCall, JoinKind};
use crate::compiler::{RowPredicate, ValueMapper};
use crate::context::EvalContext;
use crate::join::JoinInput;
use crate::window::WindowSpec;
use core::fmt;
use futures::future::BoxFuture;
use rivulet_core::{Result, Value};
use std::sync::Arc;

/// Capability categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureCategory {
    ValueMap,
    Filter,
    Aggregation,
    Group,
    Join,
    Cast,
}

impl FeatureCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            FeatureCategory::ValueMap => "value-map",
            FeatureCategory::Filter => "filter",
            FeatureCategory::Aggregation => "agg",
            FeatureCategory::Group => "group",
            FeatureCategory::Join => "join",
            FeatureCategory::Cast => "cast",
        }
    }
}

/// Registry key, displayed as `category:name` (e.g. `value-map:upper`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureId {
    category: FeatureCategory,
    name: String,
}

impl FeatureId {
    /// Names are case-insensitive.
    pub fn new(category: FeatureCategory, name: &str) -> Self {
        Self {
            category,
            name: name.to_lowercase(),
        }
    }

    pub fn value_map(name: &str) -> Self {
        Self::new(FeatureCategory::ValueMap, name)
    }

    pub fn filter(name: &str) -> Self {
        Self::new(FeatureCategory::Filter, name)
    }

    pub fn aggregation(name: &str) -> Self {
        Self::new(FeatureCategory::Aggregation, name)
    }

    pub fn group(name: &str) -> Self {
        Self::new(FeatureCategory::Group, name)
    }

    pub fn join(kind: JoinKind) -> Self {
        Self::new(FeatureCategory::Join, kind.name())
    }

    pub fn cast(name: &str) -> Self {
        Self::new(FeatureCategory::Cast, name)
    }

    pub fn category(&self) -> FeatureCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.prefix(), self.name)
    }
}

/// Compiles an expression into a value-producing function.
pub trait ValueMapFeature: Send + Sync {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper>;
}

/// Compiles a boolean expression into a record predicate.
pub trait FilterFeature: Send + Sync {
    fn create_predicate(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<RowPredicate>;
}

/// Compiles an aggregate call into an operand mapper and accumulator factory.
pub trait AggregationFeature: Send + Sync {
    fn create_aggregate(&self, call: &FunctionCall, metadata: &QueryMetadata) -> Result<AggregateSpec>;
}

/// Compiles a grouping function (`interval`, `_window`) into a window policy.
pub trait GroupFeature: Send + Sync {
    fn create_window(&self, call: &FunctionCall, metadata: &QueryMetadata) -> Result<WindowSpec>;
}

/// Combines two materialized sides.
pub trait JoinFeature: Send + Sync {
    fn join(
        &self,
        input: JoinInput,
        on: Option<RowPredicate>,
        ctx: EvalContext,
    ) -> BoxFuture<'static, Result<Vec<Value>>>;
}

/// Coerces a value to one target type.
pub trait CastFeature: Send + Sync {
    fn cast(&self, value: &Value) -> Result<Value>;
}

/// A registered feature of any category.
#[derive(Clone)]
pub enum Feature {
    ValueMap(Arc<dyn ValueMapFeature>),
    Filter(Arc<dyn FilterFeature>),
    Aggregation(Arc<dyn AggregationFeature>),
    Group(Arc<dyn GroupFeature>),
    Join(Arc<dyn JoinFeature>),
    Cast(Arc<dyn CastFeature>),
}

impl Feature {
    pub fn value_map(feature: impl ValueMapFeature + 'static) -> Self {
        Feature::ValueMap(Arc::new(feature))
    }

    pub fn filter(feature: impl FilterFeature + 'static) -> Self {
        Feature::Filter(Arc::new(feature))
    }

    pub fn aggregation(feature: impl AggregationFeature + 'static) -> Self {
        Feature::Aggregation(Arc::new(feature))
    }

    pub fn group(feature: impl GroupFeature + 'static) -> Self {
        Feature::Group(Arc::new(feature))
    }

    pub fn join(feature: impl JoinFeature + 'static) -> Self {
        Feature::Join(Arc::new(feature))
    }

    pub fn cast(feature: impl CastFeature + 'static) -> Self {
        Feature::Cast(Arc::new(feature))
    }

    pub fn category(&self) -> FeatureCategory {
        match self {
            Feature::ValueMap(_) => FeatureCategory::ValueMap,
            Feature::Filter(_) => FeatureCategory::Filter,
            Feature::Aggregation(_) => FeatureCategory::Aggregation,
            Feature::Group(_) => FeatureCategory::Group,
            Feature::Join(_) => FeatureCategory::Join,
            Feature::Cast(_) => FeatureCategory::Cast,
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feature({})", self.category().prefix())
    }
}
