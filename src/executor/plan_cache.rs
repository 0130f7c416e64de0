//! Compiled-plan cache.
//!
//! Maps sanitized query text to an immutable, Arc-shared compiled plan so
//! repeated queries skip lexing, parsing, planning and optimization.
//! Bounded with LRU eviction; reads take the read lock only (recency
//! stamps are atomics inside each entry).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::executor::CompiledQuery;

#[derive(Debug, Clone)]
pub struct PlanCacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        PlanCacheConfig {
            enabled: true,
            max_entries: 1000,
        }
    }
}

struct CacheEntry {
    compiled: Arc<CompiledQuery>,
    /// Logical clock stamp of the last access, for LRU eviction.
    last_accessed: AtomicU64,
    access_count: AtomicU64,
}

pub struct PlanCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: AtomicU64,
    config: PlanCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PlanCache {
    pub fn new(config: PlanCacheConfig) -> Self {
        PlanCache {
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlanCacheConfig::default())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, key: &str) -> Option<Arc<CompiledQuery>> {
        if !self.config.enabled {
            return None;
        }
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            Some(entry) => {
                entry.last_accessed.store(self.tick(), Ordering::Relaxed);
                entry.access_count.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.compiled))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, compiled: Arc<CompiledQuery>) {
        if !self.config.enabled {
            return;
        }
        let mut entries = self.entries.write().unwrap();
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            self.evict_lru(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                compiled,
                last_accessed: AtomicU64::new(self.tick()),
                access_count: AtomicU64::new(0),
            },
        );
    }

    fn evict_lru(&self, entries: &mut HashMap<String, CacheEntry>) {
        let victim = entries
            .iter()
            .min_by_key(|(_, e)| e.last_accessed.load(Ordering::Relaxed))
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn metrics(&self) -> PlanCacheMetrics {
        PlanCacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.read().unwrap().len(),
            max_entries: self.config.max_entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl PlanCacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_parser::parse_query;
    use crate::planner::PlanBuilder;

    fn compiled(text: &str) -> Arc<CompiledQuery> {
        let query = parse_query(text).unwrap();
        let plan = PlanBuilder::build(&query);
        Arc::new(CompiledQuery {
            query,
            plan,
            next: None,
            union: None,
        })
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache = PlanCache::with_defaults();
        assert!(cache.get("MATCH (n) RETURN n").is_none());
        cache.insert(
            "MATCH (n) RETURN n".to_string(),
            compiled("MATCH (n) RETURN n"),
        );
        assert!(cache.get("MATCH (n) RETURN n").is_some());
        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.size, 1);
        assert_eq!(metrics.hit_rate(), 0.5);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = PlanCache::new(PlanCacheConfig {
            enabled: true,
            max_entries: 2,
        });
        cache.insert("a".to_string(), compiled("MATCH (a) RETURN a"));
        cache.insert("b".to_string(), compiled("MATCH (b) RETURN b"));
        // Touch "a" so "b" becomes the LRU victim.
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), compiled("MATCH (c) RETURN c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = PlanCache::new(PlanCacheConfig {
            enabled: false,
            max_entries: 10,
        });
        cache.insert("a".to_string(), compiled("MATCH (a) RETURN a"));
        assert!(cache.get("a").is_none());
        assert_eq!(cache.metrics().size, 0);
    }
}
