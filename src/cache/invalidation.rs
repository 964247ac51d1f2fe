//! Version-change driven invalidation.
//!
//! Content stores notify a `ContentChangeObserver` when a version changes;
//! `VersionInvalidator` advances the version identity of the content and
//! evicts entries that depended on the superseded keys.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::content::ContentRef;

use super::keys::{ContentCacheKeyCreator, DefaultCacheKeyCreator};
use super::store::MemoryObjectCache;

pub trait ContentChangeObserver: Send + Sync {
    /// A new version of `link` became the published one.
    fn content_published(&self, link: ContentRef);

    /// A draft of `link` was created or changed; published content is untouched.
    fn draft_saved(&self, link: ContentRef);
}

pub struct VersionInvalidator {
    cache: Arc<MemoryObjectCache>,
    keys: Arc<DefaultCacheKeyCreator>,
}

impl VersionInvalidator {
    pub fn new(cache: Arc<MemoryObjectCache>, keys: Arc<DefaultCacheKeyCreator>) -> Self {
        Self { cache, keys }
    }
}

impl ContentChangeObserver for VersionInvalidator {
    #[instrument(skip(self), fields(content = %link))]
    fn content_published(&self, link: ContentRef) {
        let superseded_common = self.keys.common_cache_key(link);
        let superseded_version = self.keys.version_common_cache_key(link);
        self.keys.advance_published(link);

        let common = self.cache.invalidate_dependency(&superseded_common);
        let version = self.cache.invalidate_dependency(&superseded_version);
        info!(
            evicted = common + version,
            "Invalidated cached settings after publish"
        );
    }

    #[instrument(skip(self), fields(content = %link))]
    fn draft_saved(&self, link: ContentRef) {
        let superseded = self.keys.version_common_cache_key(link);
        self.keys.advance_draft(link);

        let evicted = self.cache.invalidate_dependency(&superseded);
        info!(evicted, "Invalidated cached draft settings");
    }
}
