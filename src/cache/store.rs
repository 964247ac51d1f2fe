//! Object cache storage.
//!
//! `ObjectCache` is the backend contract the settings resolver consumes;
//! `MemoryObjectCache` is the in-process implementation with LRU eviction and
//! dependency-driven invalidation.

use std::any::Any;
use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::DependencyKey;
use super::lock::{rw_read, rw_write};
use super::policy::EvictionPolicy;
use super::registry::CacheRegistry;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "sitesettings_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "sitesettings_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "sitesettings_cache_evict_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "sitesettings_cache_invalidated_total";

/// Type-erased cached value; readers downcast to the type they expect.
pub type CachedObject = Arc<dyn Any + Send + Sync>;

/// Key/value cache whose entries are evicted when a dependency key changes.
///
/// Implementations must be safe for concurrent reads and inserts.
pub trait ObjectCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedObject>;

    fn insert(&self, key: String, value: CachedObject, policy: EvictionPolicy);
}

struct CachedEntry {
    value: CachedObject,
    policy: EvictionPolicy,
}

pub struct MemoryObjectCache {
    config: CacheConfig,
    entries: RwLock<LruCache<String, CachedEntry>>,
    registry: CacheRegistry,
}

impl MemoryObjectCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            registry: CacheRegistry::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Evict every entry depending on `dependency`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_dependency(&self, dependency: &DependencyKey) -> usize {
        let affected = self.registry.take_dependency(dependency);
        if affected.is_empty() {
            return 0;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_dependency");
        let mut removed = 0;
        for key in &affected {
            if entries.pop(key).is_some() {
                removed += 1;
            }
        }
        drop(entries);

        counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        debug!(
            dependency = %dependency,
            removed,
            "Evicted cache entries for changed dependency"
        );
        removed
    }

    /// The eviction policy recorded for `key`, if the entry is cached.
    pub fn policy_for(&self, key: &str) -> Option<EvictionPolicy> {
        rw_read(&self.entries, SOURCE, "policy_for")
            .peek(key)
            .map(|entry| entry.policy.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(key)
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.registry.clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectCache for MemoryObjectCache {
    fn get(&self, key: &str) -> Option<CachedObject> {
        if !self.config.enabled {
            return None;
        }

        // `LruCache::get` promotes the entry, so even reads take the write lock.
        let hit = rw_write(&self.entries, SOURCE, "get")
            .get(key)
            .map(|entry| Arc::clone(&entry.value));

        match hit {
            Some(value) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(value)
            }
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                None
            }
        }
    }

    fn insert(&self, key: String, value: CachedObject, policy: EvictionPolicy) {
        if !self.config.enabled {
            return;
        }

        self.registry.register(&key, policy.key_set());
        let evicted = rw_write(&self.entries, SOURCE, "insert").push(
            key.clone(),
            CachedEntry { value, policy },
        );

        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                self.registry.unregister(&evicted_key);
                counter!(METRIC_CACHE_EVICT).increment(1);
                debug!(evicted = %evicted_key, "Evicted cache entry due to capacity");
            }
        }
    }
}
