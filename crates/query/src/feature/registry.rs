//! The feature registry.
//!
//! A process-wide registry, initialized with the built-in features on first use,
//! backs every query. Queries shadow entries through `QueryMetadata` instead of
//! mutating it; `register_global` exists for installing extensions at startup.

use super::{Feature, FeatureId};
use crate::{aggregate, functions, join, window};
use hashbrown::HashMap;
use parking_lot::RwLock;
use rivulet_core::{Error, Result};
use std::sync::OnceLock;

/// Mapping from feature id to implementation.
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    features: HashMap<FeatureId, Feature>,
}

impl FeatureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in feature.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        functions::register_defaults(&mut registry);
        aggregate::register_defaults(&mut registry);
        window::register_defaults(&mut registry);
        join::register_defaults(&mut registry);
        registry
    }

    /// Registers `feature` under `id`, returning the entry it replaces.
    pub fn register(&mut self, id: FeatureId, feature: Feature) -> Option<Feature> {
        debug_assert_eq!(id.category(), feature.category(), "feature {} has wrong category", id);
        self.features.insert(id, feature)
    }

    pub fn lookup(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    /// Like `lookup`, failing with `UnsupportedFeature` naming `expression`.
    pub fn lookup_required(&self, id: &FeatureId, expression: &str) -> Result<&Feature> {
        self.lookup(id)
            .ok_or_else(|| Error::unsupported_feature(id.to_string(), expression))
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

static GLOBAL: OnceLock<RwLock<FeatureRegistry>> = OnceLock::new();

/// The process-wide registry.
pub fn global() -> &'static RwLock<FeatureRegistry> {
    GLOBAL.get_or_init(|| {
        let registry = FeatureRegistry::with_defaults();
        log::debug!("initialized global feature registry with {} features", registry.len());
        RwLock::new(registry)
    })
}

/// Installs a feature for every query compiled afterwards.
pub fn register_global(id: FeatureId, feature: Feature) -> Option<Feature> {
    global().write().register(id, feature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::JoinKind;

    #[test]
    fn test_defaults_cover_categories() {
        let registry = FeatureRegistry::with_defaults();
        for id in [
            FeatureId::value_map("property"),
            FeatureId::value_map("select"),
            FeatureId::value_map("case-when"),
            FeatureId::value_map("cast"),
            FeatureId::value_map("+"),
            FeatureId::value_map("math.plus"),
            FeatureId::value_map("bit_count"),
            FeatureId::value_map("date_format"),
            FeatureId::filter("="),
            FeatureId::filter("between"),
            FeatureId::filter("in"),
            FeatureId::aggregation("count"),
            FeatureId::aggregation("avg"),
            FeatureId::group("interval"),
            FeatureId::group("_window"),
            FeatureId::join(JoinKind::Right),
            FeatureId::cast("decimal"),
        ] {
            assert!(registry.contains(&id), "missing {}", id);
        }
    }

    #[test]
    fn test_lookup_required_names_expression() {
        let registry = FeatureRegistry::new();
        let err = registry
            .lookup_required(&FeatureId::value_map("nope"), "nope(1)")
            .unwrap_err();
        assert_eq!(err, Error::unsupported_feature("value-map:nope", "nope(1)"));
    }

    #[test]
    fn test_global_is_initialized_once() {
        let a = global().read().len();
        let b = global().read().len();
        assert_eq!(a, b);
        assert!(a > 0);
    }
}
