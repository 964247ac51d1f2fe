//! Bidirectional dependency registry.
//!
//! Tracks which cache entries depend on which dependency keys so that
//! invalidating a key can find every affected entry.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::DependencyKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Tracks dependency → cache_keys and cache_key → dependencies mappings.
///
/// Lock order is always `dependency_to_keys` then `key_to_dependencies`.
pub struct CacheRegistry {
    dependency_to_keys: RwLock<HashMap<DependencyKey, HashSet<String>>>,
    key_to_dependencies: RwLock<HashMap<String, HashSet<DependencyKey>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            dependency_to_keys: RwLock::new(HashMap::new()),
            key_to_dependencies: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache entry with its dependency keys, replacing any
    /// previous registration of the same entry.
    pub fn register(&self, cache_key: &str, dependencies: HashSet<DependencyKey>) {
        let mut d2k = rw_write(&self.dependency_to_keys, SOURCE, "register.d2k");
        let mut k2d = rw_write(&self.key_to_dependencies, SOURCE, "register.k2d");

        if let Some(previous) = k2d.remove(cache_key) {
            detach(&mut d2k, cache_key, previous);
        }
        for dependency in &dependencies {
            d2k.entry(dependency.clone())
                .or_default()
                .insert(cache_key.to_string());
        }
        k2d.insert(cache_key.to_string(), dependencies);
    }

    /// Remove a cache entry and clean up its dependency mappings.
    pub fn unregister(&self, cache_key: &str) {
        let mut d2k = rw_write(&self.dependency_to_keys, SOURCE, "unregister.d2k");
        let mut k2d = rw_write(&self.key_to_dependencies, SOURCE, "unregister.k2d");

        if let Some(dependencies) = k2d.remove(cache_key) {
            detach(&mut d2k, cache_key, dependencies);
        }
    }

    /// Remove a dependency key together with every entry depending on it.
    ///
    /// Returns the cache keys that must be evicted.
    pub fn take_dependency(&self, dependency: &DependencyKey) -> HashSet<String> {
        let mut d2k = rw_write(&self.dependency_to_keys, SOURCE, "take_dependency.d2k");
        let mut k2d = rw_write(&self.key_to_dependencies, SOURCE, "take_dependency.k2d");

        let affected = d2k.remove(dependency).unwrap_or_default();
        for cache_key in &affected {
            if let Some(dependencies) = k2d.remove(cache_key) {
                detach(&mut d2k, cache_key, dependencies);
            }
        }
        affected
    }

    pub fn clear(&self) {
        rw_write(&self.dependency_to_keys, SOURCE, "clear.d2k").clear();
        rw_write(&self.key_to_dependencies, SOURCE, "clear.k2d").clear();
    }

    pub fn dependency_count(&self) -> usize {
        rw_read(&self.dependency_to_keys, SOURCE, "dependency_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_dependencies, SOURCE, "key_count").len()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(
    d2k: &mut HashMap<DependencyKey, HashSet<String>>,
    cache_key: &str,
    dependencies: HashSet<DependencyKey>,
) {
    for dependency in dependencies {
        if let Some(keys) = d2k.get_mut(&dependency) {
            keys.remove(cache_key);
            if keys.is_empty() {
                d2k.remove(&dependency);
            }
        }
    }
}
