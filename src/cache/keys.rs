//! Cache key definitions.
//!
//! Settings entries are keyed by a flat string; their eviction is driven by
//! `DependencyKey`s naming the version identity of the content they came from.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};
use crate::domain::content::{ContentRef, LanguageTag};

const SOURCE: &str = "cache::keys";

pub const SITE_SETTINGS_CACHE_PREFIX: &str = "SiteSettingsCache";
const DRAFT_SEGMENT: &str = "-common-draft";

/// Build the cache key for settings of `settings_type` under a start page.
///
/// Draft and published entries, and every language, get distinct keys.
pub fn site_settings_cache_key(
    start_page: ContentRef,
    settings_type: &str,
    is_draft: bool,
    language: &LanguageTag,
) -> String {
    let draft = if is_draft { DRAFT_SEGMENT } else { "" };
    format!(
        "{SITE_SETTINGS_CACHE_PREFIX}-{}-{draft}-{language}-{settings_type}",
        start_page.id
    )
}

/// Opaque token whose invalidation evicts every entry depending on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(String);

impl DependencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives version-identity keys for content.
///
/// The common key follows the published version of an item; the version
/// common key additionally follows its drafts. A key changes whenever the
/// version it names changes.
pub trait ContentCacheKeyCreator: Send + Sync {
    fn common_cache_key(&self, link: ContentRef) -> DependencyKey;

    fn version_common_cache_key(&self, link: ContentRef) -> DependencyKey;
}

/// Version counters of one content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct VersionStamp {
    published: u64,
    revision: u64,
}

/// Key creator stamping every key with the item's current version.
///
/// Versions start at zero and advance through [`advance_published`] and
/// [`advance_draft`], which `VersionInvalidator` calls on content changes.
///
/// [`advance_published`]: DefaultCacheKeyCreator::advance_published
/// [`advance_draft`]: DefaultCacheKeyCreator::advance_draft
#[derive(Debug, Default)]
pub struct DefaultCacheKeyCreator {
    stamps: RwLock<HashMap<u64, VersionStamp>>,
}

impl DefaultCacheKeyCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new version of `link` was published. Drafts fall back to published
    /// content, so both scopes move.
    pub fn advance_published(&self, link: ContentRef) {
        let mut stamps = rw_write(&self.stamps, SOURCE, "advance_published");
        let stamp = stamps.entry(link.id).or_default();
        stamp.published += 1;
        stamp.revision += 1;
    }

    /// A draft of `link` changed; the published scope is untouched.
    pub fn advance_draft(&self, link: ContentRef) {
        rw_write(&self.stamps, SOURCE, "advance_draft")
            .entry(link.id)
            .or_default()
            .revision += 1;
    }

    fn stamp(&self, link: ContentRef) -> VersionStamp {
        rw_read(&self.stamps, SOURCE, "stamp")
            .get(&link.id)
            .copied()
            .unwrap_or_default()
    }
}

impl ContentCacheKeyCreator for DefaultCacheKeyCreator {
    fn common_cache_key(&self, link: ContentRef) -> DependencyKey {
        let stamp = self.stamp(link);
        DependencyKey(format!("content:{}:common:{}", link.id, stamp.published))
    }

    fn version_common_cache_key(&self, link: ContentRef) -> DependencyKey {
        let stamp = self.stamp(link);
        DependencyKey(format!(
            "content:{}:version-common:{}",
            link.id, stamp.revision
        ))
    }
}
