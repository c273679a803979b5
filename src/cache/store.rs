//! Object tier storage.
//!
//! An in-process LRU of JSON values with a per-entry expiry. This is the fast
//! tier consulted before the persistent transient store.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use serde_json::Value;

use super::config::{CacheConfig, MAX_ENTRY_TTL_SECS};
use super::lock::rw_write;

const SOURCE: &str = "cache::store";
const METRIC_OBJECT_EVICT: &str = "bizdir_cache_object_evict_total";
const MAX_ENTRY_TTL: Duration = Duration::from_secs(MAX_ENTRY_TTL_SECS);

#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-memory object tier keyed by the plain explore key strings.
pub struct ObjectStore {
    entries: RwLock<LruCache<String, Entry>>,
}

impl ObjectStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.object_tier_capacity_non_zero())),
        }
    }

    /// Live value for `key`; expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl.min(MAX_ENTRY_TTL),
        };
        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = displaced
            && evicted_key != key
        {
            counter!(METRIC_OBJECT_EVICT).increment(1);
        }
    }

    /// Returns true if an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        rw_write(&self.entries, SOURCE, "remove").pop(key).is_some()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
