//! Results cache for automapper runs
//!
//! Completed results are stored under a SHA-256 hash of the run's inputs and
//! returned verbatim for identical runs. Entries are immutable once stored, so
//! the cache can be shared freely between automapper instances and threads.
//!
//! # Key Contents
//!
//! ```text
//! headers (all normalized forms), base table, starting table,
//! starting path, path offset, scope, allow-multiple flag, schema fingerprint
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::engine::AutomapperResults;
use super::headers::HeaderEntry;
use crate::schema::AutomapperScope;

/// Capacity of the process-wide cache
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

static GLOBAL_CACHE: Lazy<ResultsCache> = Lazy::new(|| ResultsCache::new(DEFAULT_CACHE_CAPACITY));

/// Compute SHA256 hash of a serializable value.
///
/// The value is serialized to JSON before hashing, ensuring deterministic output.
/// Returns a 64-character lowercase hexadecimal string.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Everything that influences the results of a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CacheKeyInput<'a> {
    pub headers: &'a [HeaderEntry],
    pub base_table: &'a str,
    pub starting_table: &'a str,
    pub starting_path: &'a [String],
    pub path_offset: usize,
    pub scope: AutomapperScope,
    pub allow_multiple_mappings: bool,
    pub schema_fingerprint: &'a str,
}

impl CacheKeyInput<'_> {
    pub fn key(&self) -> Result<String, serde_json::Error> {
        compute_hash(self)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
}

#[derive(Debug)]
struct LruState {
    capacity: usize,
    map: HashMap<String, AutomapperResults>,
    order: VecDeque<String>,
    hits: usize,
    misses: usize,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }
}

/// Bounded LRU store of completed results
#[derive(Debug)]
pub struct ResultsCache {
    state: Mutex<LruState>,
}

impl ResultsCache {
    /// Create a cache holding at most `capacity` results (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(LruState {
                capacity,
                map: HashMap::new(),
                order: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Process-wide cache used by automapper instances by default
    pub fn global() -> &'static ResultsCache {
        &GLOBAL_CACHE
    }

    pub fn get(&self, key: &str) -> Option<AutomapperResults> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.map.get(key).cloned() {
            Some(results) => {
                state.hits += 1;
                state.touch(key);
                Some(results)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store results, evicting the least recently used entry when full
    pub fn put(&self, key: String, results: AutomapperResults) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.map.contains_key(&key) && state.map.len() >= state.capacity {
            if let Some(oldest) = state.order.pop_back() {
                state.map.remove(&oldest);
            }
        }
        state.touch(&key);
        state.map.insert(key, results);
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.map.clear();
        state.order.clear();
        state.hits = 0;
        state.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.map.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results(header: &str, path: &[&str]) -> AutomapperResults {
        let mut results = AutomapperResults::new();
        results.insert(
            header.to_string(),
            vec![path.iter().map(|s| s.to_string()).collect()],
        );
        results
    }

    #[test]
    fn test_compute_hash_deterministic() {
        let value = json!({"baseTable": "collectionobject", "pathOffset": 0});
        let hash1 = compute_hash(&value).unwrap();
        let hash2 = compute_hash(&value).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, compute_hash(&json!({"baseTable": "agent"})).unwrap());
    }

    #[test]
    fn test_key_depends_on_inputs() {
        let headers = vec![HeaderEntry::new("Catalog Number")];
        let input = CacheKeyInput {
            headers: &headers,
            base_table: "collectionobject",
            starting_table: "collectionobject",
            starting_path: &[],
            path_offset: 0,
            scope: AutomapperScope::Automapper,
            allow_multiple_mappings: false,
            schema_fingerprint: "abc",
        };
        let other = CacheKeyInput {
            scope: AutomapperScope::Suggestion,
            ..input
        };
        assert_ne!(input.key().unwrap(), other.key().unwrap());
    }

    #[test]
    fn test_get_put_and_stats() {
        let cache = ResultsCache::new(4);
        assert!(cache.get("missing").is_none());

        cache.put("a".to_string(), results("Remarks", &["remarks"]));
        assert_eq!(cache.get("a"), Some(results("Remarks", &["remarks"])));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ResultsCache::new(2);
        cache.put("a".to_string(), results("A", &["a"]));
        cache.put("b".to_string(), results("B", &["b"]));

        // refresh "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.put("c".to_string(), results("C", &["c"]));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
