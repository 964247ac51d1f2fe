mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use sitesettings::application::context::{ContextMode, RequestContext, SiteDefinition};
use sitesettings::application::error::SettingsError;
use sitesettings::application::repos::{ContentRepo, ContentRootRepo, RepoError};
use sitesettings::application::settings::SettingsService;
use sitesettings::cache::{
    CacheConfig, CachedObject, ContentCacheKeyCreator, DefaultCacheKeyCreator, DependencyKey,
    EvictionPolicy, MemoryObjectCache, ObjectCache, site_settings_cache_key,
};
use sitesettings::domain::content::{ContentItem, ContentRef, LanguageTag, PropertyValue};
use sitesettings::domain::settings::{LayoutSettings, SiteSettings};
use sitesettings::infra::memory::InMemoryContentStore;
use uuid::Uuid;

use support::{LAYOUT, SETTINGS_FOLDER, START_PAGE, props, publish, site, site_with, tag, types};

fn published(language: &str) -> RequestContext {
    RequestContext::new(tag(language))
}

fn editing(language: &str) -> RequestContext {
    RequestContext::new(tag(language)).with_mode(ContextMode::Edit)
}

fn hits(value: i64) -> BTreeMap<String, PropertyValue> {
    props(&[("NumberOfHits", PropertyValue::Integer(value))])
}

#[tokio::test]
async fn resolves_and_caches_layout_settings_for_a_site() {
    let site = site();

    let layout = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("layout settings resolve");

    assert_eq!(layout.number_of_hits, 5);
    assert_eq!(layout.content_link, LAYOUT);

    let key = "SiteSettingsCache-10--en-LayoutSettings";
    assert!(site.cache.contains(key));
    assert_eq!(
        site.cache.policy_for(key),
        Some(EvictionPolicy::new([
            site.keys.common_cache_key(START_PAGE),
            site.keys.common_cache_key(LAYOUT),
        ]))
    );
}

#[tokio::test]
async fn second_resolve_is_served_from_cache() {
    let site = site();
    let ctx = published("en");

    let first = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("first resolve");
    let second = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("second resolve");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(site.cache.len(), 1);
}

#[tokio::test]
async fn language_and_mode_get_separate_cache_entries() {
    let site = site();

    for ctx in [published("en"), editing("en"), published("sv")] {
        site.service
            .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
            .await
            .expect("settings resolve in every variant");
    }

    assert_eq!(site.cache.len(), 3);
    assert!(site.cache.contains("SiteSettingsCache-10--en-LayoutSettings"));
    assert!(site.cache.contains("SiteSettingsCache-10--common-draft-en-LayoutSettings"));
    assert!(site.cache.contains("SiteSettingsCache-10--sv-LayoutSettings"));
}

#[tokio::test]
async fn explicit_language_overrides_request_language() {
    let site = site();
    publish(
        &site.store,
        LAYOUT.id,
        SETTINGS_FOLDER,
        "LayoutSettings",
        Some("sv"),
        hits(3),
    );

    let swedish = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, Some(&tag("SV")), &published("en"))
        .await
        .expect("swedish settings");
    assert_eq!(swedish.number_of_hits, 3);
    assert_eq!(swedish.language, Some(tag("sv")));
    assert!(site.cache.contains("SiteSettingsCache-10--SV-LayoutSettings"));
}

#[tokio::test]
async fn missing_language_variant_falls_back_to_stored_item() {
    let site = site();

    let french = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("fr"))
        .await
        .expect("falls back to master language");

    assert_eq!(french.number_of_hits, 5);
    assert_eq!(french.language, Some(tag("en")));
}

#[tokio::test]
async fn editors_see_the_common_draft() {
    let site = site();
    let draft = site
        .store
        .save_draft(LAYOUT, &tag("en"), hits(9))
        .expect("save draft");

    let edited = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &editing("en"))
        .await
        .expect("draft settings");
    assert_eq!(edited.number_of_hits, 9);
    assert_eq!(edited.content_link, draft);

    let visitors = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("published settings");
    assert_eq!(visitors.number_of_hits, 5);

    let draft_key = "SiteSettingsCache-10--common-draft-en-LayoutSettings";
    assert_eq!(
        site.cache.policy_for(draft_key),
        Some(EvictionPolicy::new([
            site.keys.version_common_cache_key(START_PAGE),
            site.keys.version_common_cache_key(draft),
        ]))
    );
}

#[tokio::test]
async fn edit_mode_without_draft_uses_published_settings() {
    let site = site();

    let edited = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &editing("en"))
        .await
        .expect("published settings in edit mode");

    assert_eq!(edited.number_of_hits, 5);
    assert_eq!(edited.content_link, LAYOUT);
}

#[tokio::test]
async fn publishing_settings_invalidates_cached_entry() {
    let site = site();
    let ctx = published("en");

    let before = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("initial settings");
    assert_eq!(before.number_of_hits, 5);

    publish(
        &site.store,
        LAYOUT.id,
        SETTINGS_FOLDER,
        "LayoutSettings",
        Some("en"),
        hits(7),
    );
    assert!(site.cache.is_empty());

    let after = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("reloaded settings");
    assert_eq!(after.number_of_hits, 7);
}

/// Content store that publishes a new settings version right after the
/// resolver has read the current one.
struct PublishAfterRead {
    store: Arc<InMemoryContentStore>,
    armed: AtomicBool,
}

#[async_trait]
impl ContentRepo for PublishAfterRead {
    async fn get(
        &self,
        link: ContentRef,
        language: Option<&LanguageTag>,
    ) -> Result<Option<ContentItem>, RepoError> {
        let item = self.store.get(link, language).await?;
        if link.id == LAYOUT.id && self.armed.swap(false, Ordering::SeqCst) {
            publish(
                &self.store,
                LAYOUT.id,
                SETTINGS_FOLDER,
                "LayoutSettings",
                Some("en"),
                hits(7),
            );
        }
        Ok(item)
    }

    async fn get_by_guid(&self, guid: Uuid) -> Result<Option<ContentItem>, RepoError> {
        self.store.get_by_guid(guid).await
    }

    async fn children_of_type(
        &self,
        folder: ContentRef,
        content_type: &str,
    ) -> Result<Vec<ContentItem>, RepoError> {
        self.store.children_of_type(folder, content_type).await
    }

    async fn ancestors(&self, link: ContentRef) -> Result<Vec<ContentItem>, RepoError> {
        self.store.ancestors(link).await
    }

    async fn get_items(&self, links: &[ContentRef]) -> Result<Vec<ContentItem>, RepoError> {
        self.store.get_items(links).await
    }
}

#[tokio::test]
async fn publish_during_load_does_not_leave_a_stale_entry() {
    let site = site();
    let service = SettingsService::new(
        Arc::new(PublishAfterRead {
            store: Arc::clone(&site.store),
            armed: AtomicBool::new(true),
        }),
        site.store.clone(),
        site.store.clone(),
        site.store.clone(),
        site.cache.clone(),
        Arc::clone(&site.keys),
    );
    let ctx = published("en");

    let first = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("first resolve");
    assert_eq!(first.number_of_hits, 5);

    let second = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("second resolve");
    assert_eq!(second.number_of_hits, 7);

    let third = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("third resolve");
    assert!(Arc::ptr_eq(&second, &third));
}

/// Key creator whose identities change when `version` moves.
#[derive(Default)]
struct SteppedKeys {
    version: AtomicU64,
}

impl SteppedKeys {
    fn key(&self, scope: &str, link: ContentRef) -> DependencyKey {
        DependencyKey::new(format!(
            "{scope}:{}@{}",
            link.id,
            self.version.load(Ordering::SeqCst)
        ))
    }
}

impl ContentCacheKeyCreator for SteppedKeys {
    fn common_cache_key(&self, link: ContentRef) -> DependencyKey {
        self.key("common", link)
    }

    fn version_common_cache_key(&self, link: ContentRef) -> DependencyKey {
        self.key("version-common", link)
    }
}

#[tokio::test]
async fn new_version_identity_makes_the_next_lookup_a_miss() {
    let store = Arc::new(InMemoryContentStore::new(types()));
    support::seed_site(&store);
    let cache = Arc::new(MemoryObjectCache::new(&CacheConfig::default()));
    let keys = Arc::new(SteppedKeys::default());
    let service = SettingsService::from_store(store, cache.clone(), keys.clone());
    let ctx = published("en");
    let key = "SiteSettingsCache-10--en-LayoutSettings";

    let first = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("first resolve");
    let recorded = EvictionPolicy::new([
        keys.common_cache_key(START_PAGE),
        keys.common_cache_key(LAYOUT),
    ]);
    assert_eq!(cache.policy_for(key), Some(recorded.clone()));

    let hit = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("cached resolve");
    assert!(Arc::ptr_eq(&first, &hit));

    keys.version.fetch_add(1, Ordering::SeqCst);
    let reloaded = service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("reloaded settings");
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(*first, *reloaded);

    let current = EvictionPolicy::new([
        keys.common_cache_key(START_PAGE),
        keys.common_cache_key(LAYOUT),
    ]);
    assert_ne!(current, recorded);
    assert_eq!(cache.policy_for(key), Some(current));
}

#[tokio::test]
async fn invalidating_the_start_page_forces_a_reload() {
    let site = site();
    let ctx = published("en");

    let first = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("first resolve");

    let removed = site
        .cache
        .invalidate_dependency(&site.keys.common_cache_key(START_PAGE));
    assert_eq!(removed, 1);

    let second = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &ctx)
        .await
        .expect("second resolve");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[tokio::test]
async fn saving_a_draft_only_evicts_draft_entries() {
    let site = site();
    site.service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("published settings");
    site.service
        .resolve::<LayoutSettings>(START_PAGE, None, &editing("en"))
        .await
        .expect("edit settings");
    assert_eq!(site.cache.len(), 2);

    site.store
        .save_draft(LAYOUT, &tag("en"), hits(11))
        .expect("save draft");

    assert!(site.cache.contains("SiteSettingsCache-10--en-LayoutSettings"));
    assert!(!site.cache.contains("SiteSettingsCache-10--common-draft-en-LayoutSettings"));

    let edited = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &editing("en"))
        .await
        .expect("draft settings");
    assert_eq!(edited.number_of_hits, 11);
}

#[tokio::test]
async fn unresolvable_sites_yield_nothing_and_cache_nothing() {
    let site = site();
    publish(
        &site.store,
        40,
        ContentRef::ROOT,
        "StartPage",
        Some("en"),
        BTreeMap::new(),
    );
    publish(
        &site.store,
        50,
        ContentRef::ROOT,
        "StartPage",
        Some("en"),
        props(&[("SettingsFolder", PropertyValue::Reference(ContentRef::new(55)))]),
    );

    let ctx = published("en");
    for start_page in [
        ContentRef::EMPTY,
        ContentRef::new(999),
        ContentRef::new(40),
        ContentRef::new(50),
    ] {
        let resolved = site
            .service
            .resolve::<LayoutSettings>(start_page, None, &ctx)
            .await;
        assert!(resolved.is_none(), "start page {start_page} should not resolve");
    }
    assert!(site.cache.is_empty());
}

#[tokio::test]
async fn first_settings_item_in_store_order_wins() {
    let site = site();
    publish(
        &site.store,
        22,
        SETTINGS_FOLDER,
        "LayoutSettings",
        Some("en"),
        hits(42),
    );

    let layout = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("layout settings");
    assert_eq!(layout.content_link, LAYOUT);
}

#[tokio::test]
async fn unreadable_settings_resolve_to_none() {
    let site = site();
    publish(
        &site.store,
        LAYOUT.id,
        SETTINGS_FOLDER,
        "LayoutSettings",
        Some("en"),
        props(&[("NumberOfHits", PropertyValue::Text("many".to_string()))]),
    );

    let resolved = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await;
    assert!(resolved.is_none());
}

#[tokio::test]
async fn foreign_cache_value_is_treated_as_a_miss() {
    let site = site();
    let key = site_settings_cache_key(
        START_PAGE,
        LayoutSettings::CONTENT_TYPE,
        false,
        &tag("en"),
    );
    let bogus: CachedObject = Arc::new("not settings".to_string());
    site.cache.insert(key.clone(), bogus, EvictionPolicy::default());

    let layout = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("reloaded despite foreign value");
    assert_eq!(layout.number_of_hits, 5);

    let cached = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("served from the replaced entry");
    assert!(Arc::ptr_eq(&layout, &cached));
}

#[tokio::test]
async fn disabled_cache_still_resolves() {
    let site = site_with(
        InMemoryContentStore::new(types()),
        CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
    );

    let layout = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await
        .expect("settings without cache");
    assert_eq!(layout.number_of_hits, 5);
    assert!(site.cache.is_empty());
}

#[tokio::test]
async fn load_bypasses_the_cache() {
    let site = site();

    let loaded = site
        .service
        .load::<LayoutSettings>(START_PAGE, false, &tag("en"))
        .await
        .expect("loaded settings");
    assert_eq!(loaded.number_of_hits, 5);
    assert!(site.cache.is_empty());

    assert!(
        site.service
            .load::<LayoutSettings>(ContentRef::EMPTY, false, &tag("en"))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn resolve_current_requires_a_site() {
    let site = site();

    let err = site
        .service
        .resolve_current::<LayoutSettings>(&published("en"))
        .await
        .expect_err("no current site");
    assert!(matches!(err, SettingsError::NoCurrentSite));

    let ctx = published("en").with_site(SiteDefinition {
        name: "main".to_string(),
        start_page: START_PAGE,
    });
    let layout = site
        .service
        .resolve_current::<LayoutSettings>(&ctx)
        .await
        .expect("site configured")
        .expect("settings exist");
    assert_eq!(layout.number_of_hits, 5);
}

#[tokio::test]
async fn initialize_registers_the_settings_root_once() {
    let site = site();
    assert_eq!(site.service.global_settings_root(), None);

    site.service.initialize().await;
    let root = site
        .service
        .global_settings_root()
        .expect("settings root recorded");

    site.service.initialize().await;
    assert_eq!(site.service.global_settings_root(), Some(root));

    let roots = site.store.list().await.expect("list roots");
    assert_eq!(roots, vec![ContentRef::ROOT, root]);

    let stored = site
        .store
        .get(root, None)
        .await
        .expect("get root")
        .expect("root exists");
    assert_eq!(stored.name, "SettingsRoot");
    assert_eq!(stored.parent, Some(ContentRef::ROOT));
}

#[tokio::test]
async fn initialize_swallows_registration_failures() {
    let site = site_with(
        InMemoryContentStore::new(types()).without_root_registration(),
        CacheConfig::default(),
    );

    site.service.initialize().await;
    assert_eq!(site.service.global_settings_root(), None);

    let layout = site
        .service
        .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
        .await;
    assert!(layout.is_some());
}

struct UnavailableContent;

#[async_trait]
impl ContentRepo for UnavailableContent {
    async fn get(
        &self,
        _link: ContentRef,
        _language: Option<&LanguageTag>,
    ) -> Result<Option<ContentItem>, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn get_by_guid(&self, _guid: Uuid) -> Result<Option<ContentItem>, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn children_of_type(
        &self,
        _folder: ContentRef,
        _content_type: &str,
    ) -> Result<Vec<ContentItem>, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn ancestors(&self, _link: ContentRef) -> Result<Vec<ContentItem>, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn get_items(&self, _links: &[ContentRef]) -> Result<Vec<ContentItem>, RepoError> {
        Err(RepoError::Timeout)
    }
}

#[tokio::test]
async fn content_store_failures_become_absent_results() {
    let store = Arc::new(InMemoryContentStore::new(types()));
    let service = SettingsService::new(
        Arc::new(UnavailableContent),
        store.clone(),
        store.clone(),
        store,
        Arc::new(MemoryObjectCache::new(&CacheConfig::default())),
        Arc::new(DefaultCacheKeyCreator::new()),
    );

    assert!(
        service
            .resolve::<LayoutSettings>(START_PAGE, None, &published("en"))
            .await
            .is_none()
    );
    assert!(service.resolve_start_page_by_reference(START_PAGE).await.is_none());
    assert!(service.resolve_start_page_by_guid(Uuid::new_v4()).await.is_none());

    service.initialize().await;
    assert_eq!(service.global_settings_root(), None);
}
