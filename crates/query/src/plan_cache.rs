//! Compiled plan cache for repeated query text.
//!
//! Plans are immutable, so a cached plan can be handed out to any number of
//! concurrent executions. A cache is tied to the `QueryMetadata` it compiles with:
//! the same text compiled under other overrides or settings needs its own cache.

use crate::ast::QueryParser;
use crate::executor::Plan;
use crate::feature::QueryMetadata;
use hashbrown::HashMap;
use log::trace;
use parking_lot::Mutex;
use rivulet_core::Result;

struct CacheEntry {
    plan: Plan,
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    access_counter: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn evict_lru(&mut self) {
        let lru = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(text, _)| text.clone());
        if let Some(text) = lru {
            trace!("evicting cached plan `{}`", text);
            self.entries.remove(&text);
        }
    }
}

/// LRU cache of compiled plans keyed by query text.
pub struct PlanCache {
    state: Mutex<CacheState>,
    metadata: QueryMetadata,
    max_size: usize,
}

impl PlanCache {
    pub fn new(metadata: QueryMetadata, max_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            metadata,
            max_size: max_size.max(1),
        }
    }

    /// A 64-entry cache over the global registry and default settings.
    pub fn default_size() -> Self {
        Self::new(QueryMetadata::new(), 64)
    }

    /// Returns the cached plan for `sql`, parsing and compiling it on a miss.
    ///
    /// Failed compilations are not cached.
    pub fn get_or_compile(&self, sql: &str, parser: &dyn QueryParser) -> Result<Plan> {
        {
            let mut state = self.state.lock();
            state.access_counter += 1;
            let now = state.access_counter;
            if let Some(entry) = state.entries.get_mut(sql) {
                entry.last_access = now;
                let plan = entry.plan.clone();
                state.hits += 1;
                return Ok(plan);
            }
            state.misses += 1;
        }

        // compiled outside the lock; a concurrent miss on the same text compiles twice
        let plan = Plan::compile_sql(sql, parser, &self.metadata)?;

        let mut state = self.state.lock();
        if !state.entries.contains_key(sql) && state.entries.len() >= self.max_size {
            state.evict_lru();
        }
        state.access_counter += 1;
        let last_access = state.access_counter;
        state.entries.insert(
            sql.to_string(),
            CacheEntry {
                plan: plan.clone(),
                last_access,
            },
        );
        Ok(plan)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.state.lock().hits
    }

    pub fn misses(&self) -> u64 {
        self.state.lock().misses
    }

    /// Returns cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let state = self.state.lock();
        let total = state.hits + state.misses;
        if total == 0 {
            0.0
        } else {
            state.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, SelectStatement};
    use rivulet_core::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts `select <table>`, counting calls.
    struct CountingParser(AtomicUsize);

    impl QueryParser for CountingParser {
        fn parse(&self, sql: &str) -> Result<SelectStatement> {
            self.0.fetch_add(1, Ordering::SeqCst);
            match sql.strip_prefix("select ") {
                Some(table) => Ok(SelectStatement::new().select(Expr::this()).from(table)),
                None => Err(Error::parse(format!("cannot parse `{}`", sql))),
            }
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let parser = CountingParser(AtomicUsize::new(0));
        let cache = PlanCache::default_size();
        let first = cache.get_or_compile("select a", &parser).unwrap();
        let second = cache.get_or_compile("select a", &parser).unwrap();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(parser.0.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lru_eviction() {
        let parser = CountingParser(AtomicUsize::new(0));
        let cache = PlanCache::new(QueryMetadata::new(), 2);
        cache.get_or_compile("select a", &parser).unwrap();
        cache.get_or_compile("select b", &parser).unwrap();
        // touch `a` so `b` is the least recently used
        cache.get_or_compile("select a", &parser).unwrap();
        cache.get_or_compile("select c", &parser).unwrap();
        assert_eq!(cache.len(), 2);

        let compiled = parser.0.load(Ordering::SeqCst);
        cache.get_or_compile("select a", &parser).unwrap();
        assert_eq!(parser.0.load(Ordering::SeqCst), compiled);
        cache.get_or_compile("select b", &parser).unwrap();
        assert_eq!(parser.0.load(Ordering::SeqCst), compiled + 1);
    }

    #[test]
    fn test_errors_not_cached() {
        let parser = CountingParser(AtomicUsize::new(0));
        let cache = PlanCache::default_size();
        assert!(cache.get_or_compile("delete a", &parser).is_err());
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.misses(), 0);
    }
}
