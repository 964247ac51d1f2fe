//! Settings object cache.
//!
//! Resolved settings are cached under deterministic string keys and evicted
//! when the version identity of any content they were built from changes:
//!
//! - `keys`: settings cache keys and content dependency keys
//! - `store`: the `ObjectCache` contract and the in-memory LRU backend
//! - `invalidation`: bridges content store change notifications to evictions
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 256
//! ```

mod config;
mod invalidation;
mod keys;
pub(crate) mod lock;
mod policy;
mod registry;
mod store;

pub use config::CacheConfig;
pub use invalidation::{ContentChangeObserver, VersionInvalidator};
pub use keys::{
    ContentCacheKeyCreator, DefaultCacheKeyCreator, DependencyKey, SITE_SETTINGS_CACHE_PREFIX,
    site_settings_cache_key,
};
pub use policy::EvictionPolicy;
pub use registry::CacheRegistry;
pub use store::{CachedObject, MemoryObjectCache, ObjectCache};

pub(crate) use store::{
    METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
};
