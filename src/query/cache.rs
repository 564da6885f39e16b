use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;

use crate::core::types::Document;

/// Cached aggregation results keyed by collection, collection version and
/// the serialized pipeline. Bumping the version on every mutation makes
/// stale entries unreachable; LRU eviction reclaims them.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ResultKey {
    pub collection: String,
    pub version: u64,
    pub query: String,
}

pub struct QueryCache {
    cache: RwLock<LruCache<ResultKey, Vec<Document>>>,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        QueryCache {
            cache: RwLock::new(LruCache::new(cap)),
            capacity,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &ResultKey) -> Option<Vec<Document>> {
        let mut cache = self.cache.write().unwrap();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: ResultKey, results: Vec<Document>) {
        let mut cache = self.cache.write().unwrap();
        cache.put(key, results);
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap();
        cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.read().unwrap().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Document;

    fn key(version: u64) -> ResultKey {
        ResultKey {
            collection: "books".to_string(),
            version,
            query: "[]".to_string(),
        }
    }

    #[test]
    fn hit_and_miss_counters() {
        let cache = QueryCache::new(4);
        assert!(cache.get(&key(1)).is_none());

        cache.put(key(1), vec![Document::new().with("a", 1)]);
        assert_eq!(cache.get(&key(1)).unwrap().len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn version_bump_misses_old_entries() {
        let cache = QueryCache::new(4);
        cache.put(key(1), vec![]);
        assert!(cache.get(&key(2)).is_none());
    }
}
