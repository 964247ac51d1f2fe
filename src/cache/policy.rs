use std::collections::HashSet;

use super::keys::DependencyKey;

/// Eviction policy attached to a cache entry.
///
/// The entry lives until any of its dependency keys is invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvictionPolicy {
    dependency_keys: Vec<DependencyKey>,
}

impl EvictionPolicy {
    pub fn new(keys: impl IntoIterator<Item = DependencyKey>) -> Self {
        let mut dependency_keys: Vec<DependencyKey> = Vec::new();
        for key in keys {
            if !dependency_keys.contains(&key) {
                dependency_keys.push(key);
            }
        }
        Self { dependency_keys }
    }

    pub fn dependency_keys(&self) -> &[DependencyKey] {
        &self.dependency_keys
    }

    pub fn depends_on(&self, key: &DependencyKey) -> bool {
        self.dependency_keys.contains(key)
    }

    pub(crate) fn key_set(&self) -> HashSet<DependencyKey> {
        self.dependency_keys.iter().cloned().collect()
    }
}
