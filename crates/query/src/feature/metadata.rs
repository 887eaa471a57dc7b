//! Query metadata: settings plus local feature overrides.

use super::{
    AggregationFeature, CastFeature, Feature, FeatureId, FeatureRegistry, FilterFeature,
    GroupFeature, JoinFeature, ValueMapFeature,
};
use crate::ast::JoinKind;
use crate::settings::QuerySettings;
use rivulet_core::{Error, Result};
use std::sync::Arc;

/// Compile-time view of the registry for one query.
///
/// Local entries shadow the global registry; nested subqueries inherit both the
/// overrides and the settings. Scoped entries shadow both but are visible to the
/// current statement only (see `nested`).
#[derive(Clone, Default)]
pub struct QueryMetadata {
    local: Arc<FeatureRegistry>,
    scoped: Arc<FeatureRegistry>,
    settings: Arc<QuerySettings>,
}

impl QueryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Installs a feature visible to this query only.
    pub fn with_feature(mut self, id: FeatureId, feature: Feature) -> Self {
        Arc::make_mut(&mut self.local).register(id, feature);
        self
    }

    /// Installs a feature visible to the current statement but not to its subqueries.
    pub fn with_scoped_feature(mut self, id: FeatureId, feature: Feature) -> Self {
        Arc::make_mut(&mut self.scoped).register(id, feature);
        self
    }

    /// The metadata a nested statement compiles with.
    pub fn nested(&self) -> Self {
        Self {
            local: self.local.clone(),
            scoped: Arc::default(),
            settings: self.settings.clone(),
        }
    }

    pub fn settings(&self) -> &Arc<QuerySettings> {
        &self.settings
    }

    /// Resolves `id`: scoped entries, then local ones, then the global registry.
    pub fn feature(&self, id: &FeatureId) -> Option<Feature> {
        if let Some(feature) = self.scoped.lookup(id).or_else(|| self.local.lookup(id)) {
            return Some(feature.clone());
        }
        super::global().read().lookup(id).cloned()
    }

    /// Like `feature`, failing with `UnsupportedFeature` naming `expression`.
    pub fn feature_required(&self, id: &FeatureId, expression: &dyn std::fmt::Display) -> Result<Feature> {
        self.feature(id)
            .ok_or_else(|| Error::unsupported_feature(id.to_string(), expression.to_string()))
    }

    pub fn value_map(&self, name: &str) -> Option<Arc<dyn ValueMapFeature>> {
        match self.feature(&FeatureId::value_map(name))? {
            Feature::ValueMap(f) => Some(f),
            _ => None,
        }
    }

    pub fn filter(&self, name: &str) -> Option<Arc<dyn FilterFeature>> {
        match self.feature(&FeatureId::filter(name))? {
            Feature::Filter(f) => Some(f),
            _ => None,
        }
    }

    pub fn aggregation(&self, name: &str) -> Option<Arc<dyn AggregationFeature>> {
        match self.feature(&FeatureId::aggregation(name))? {
            Feature::Aggregation(f) => Some(f),
            _ => None,
        }
    }

    pub fn group(&self, name: &str) -> Option<Arc<dyn GroupFeature>> {
        match self.feature(&FeatureId::group(name))? {
            Feature::Group(f) => Some(f),
            _ => None,
        }
    }

    pub fn join(&self, kind: JoinKind) -> Option<Arc<dyn JoinFeature>> {
        match self.feature(&FeatureId::join(kind))? {
            Feature::Join(f) => Some(f),
            _ => None,
        }
    }

    pub fn cast(&self, name: &str) -> Option<Arc<dyn CastFeature>> {
        match self.feature(&FeatureId::cast(name))? {
            Feature::Cast(f) => Some(f),
            _ => None,
        }
    }

    /// `value_map`, failing with `UnsupportedFeature` naming `expression`.
    pub fn require_value_map(
        &self,
        name: &str,
        expression: &dyn std::fmt::Display,
    ) -> Result<Arc<dyn ValueMapFeature>> {
        self.value_map(name).ok_or_else(|| {
            Error::unsupported_feature(FeatureId::value_map(name).to_string(), expression.to_string())
        })
    }

    /// `filter`, failing with `UnsupportedFeature` naming `expression`.
    pub fn require_filter(
        &self,
        name: &str,
        expression: &dyn std::fmt::Display,
    ) -> Result<Arc<dyn FilterFeature>> {
        self.filter(name).ok_or_else(|| {
            Error::unsupported_feature(FeatureId::filter(name).to_string(), expression.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::compiler::test_support::ctx_for;
    use crate::compiler::{compile_value, constant, ValueMapper};
    use rivulet_core::Value;

    struct Fixed;

    impl ValueMapFeature for Fixed {
        fn create_mapper(&self, _expr: &Expr, _metadata: &QueryMetadata) -> Result<ValueMapper> {
            Ok(constant(Value::from("local")))
        }
    }

    #[tokio::test]
    async fn test_local_override_shadows_global() {
        let metadata = QueryMetadata::new()
            .with_feature(FeatureId::value_map("upper"), Feature::value_map(Fixed));
        let upper = Expr::func("upper", vec![Expr::string("abc")]);
        let local = compile_value(&upper, &metadata).unwrap();
        assert_eq!(local(&ctx_for(Value::Null)).await, Ok(Value::from("local")));

        // the global entry is untouched
        let global = compile_value(&upper, &QueryMetadata::new()).unwrap();
        assert_eq!(global(&ctx_for(Value::Null)).await, Ok(Value::from("ABC")));
        assert!(super::super::global()
            .read()
            .lookup(&FeatureId::value_map("upper"))
            .is_some());
    }

    #[test]
    fn test_missing_feature() {
        let metadata = QueryMetadata::new();
        assert!(metadata.value_map("no_such_function").is_none());
        let err = match metadata.require_value_map("no_such_function", &"no_such_function(1)") {
            Err(err) => err,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_scoped_feature_is_not_nested() {
        let metadata = QueryMetadata::new()
            .with_scoped_feature(FeatureId::value_map("count"), Feature::value_map(Fixed));
        assert!(metadata.value_map("count").is_some());
        assert!(metadata.nested().value_map("count").is_none());
        assert!(metadata.nested().aggregation("count").is_some());
    }

    #[test]
    fn test_category_mismatch_is_absent() {
        let metadata = QueryMetadata::new();
        assert!(metadata.aggregation("count").is_some());
        assert!(metadata.value_map("count").is_none());
    }
}
