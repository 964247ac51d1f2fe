#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sitesettings::application::settings::SettingsService;
use sitesettings::cache::{
    CacheConfig, ContentCacheKeyCreator, DefaultCacheKeyCreator, MemoryObjectCache,
    VersionInvalidator,
};
use sitesettings::domain::content::{ContentItem, ContentRef, LanguageTag, PropertyValue};
use sitesettings::domain::schema::{
    ContentKind, ContentTypeDefinition, ContentTypeRegistry, FrozenContentTypeRegistry,
    settings_folder_definition, start_page_definition,
};
use sitesettings::domain::settings::{LayoutSettings, SiteSettings};
use sitesettings::infra::memory::InMemoryContentStore;
use uuid::Uuid;

pub const START_PAGE: ContentRef = ContentRef::new(10);
pub const SETTINGS_FOLDER: ContentRef = ContentRef::new(20);
pub const LAYOUT: ContentRef = ContentRef::new(21);
pub const ARTICLE_PAGE_TYPE: &str = "ArticlePage";

pub fn tag(value: &str) -> LanguageTag {
    LanguageTag::parse(value).expect("valid language tag")
}

pub fn article_page_definition() -> ContentTypeDefinition {
    ContentTypeDefinition {
        name: ARTICLE_PAGE_TYPE.to_string(),
        display_name: "Article".to_string(),
        guid: Uuid::from_u128(0xa271c1e0_0000_4000_8000_000000000001),
        description: None,
        available_in_edit_mode: true,
        kind: ContentKind::Page,
    }
}

/// Built-in types plus a plain page type.
pub fn types() -> Arc<FrozenContentTypeRegistry> {
    let mut registry = ContentTypeRegistry::new();
    registry
        .register(start_page_definition())
        .expect("start page type");
    registry
        .register(settings_folder_definition())
        .expect("settings folder type");
    registry
        .register(LayoutSettings::definition())
        .expect("layout settings type");
    registry
        .register(article_page_definition())
        .expect("article page type");
    Arc::new(registry.freeze())
}

pub fn props(values: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn item(
    store: &InMemoryContentStore,
    id: u64,
    parent: ContentRef,
    content_type: &str,
    language: Option<&str>,
    properties: BTreeMap<String, PropertyValue>,
) -> ContentItem {
    let content_type = store
        .content_types()
        .get(content_type)
        .expect("registered content type");
    ContentItem {
        link: ContentRef::new(id),
        guid: Uuid::from_u128(0x5e77_0000 + u128::from(id)),
        name: format!("content-{id}"),
        parent: Some(parent),
        content_type: content_type.id,
        language: language.map(tag),
        existing_languages: Vec::new(),
        properties,
    }
}

pub fn publish(
    store: &InMemoryContentStore,
    id: u64,
    parent: ContentRef,
    content_type: &str,
    language: Option<&str>,
    properties: BTreeMap<String, PropertyValue>,
) {
    store
        .publish(item(store, id, parent, content_type, language, properties))
        .expect("publish content");
}

/// Start page 10 (en) → settings folder 20 → layout settings 21 (en, 5 hits).
pub fn seed_site(store: &InMemoryContentStore) {
    publish(
        store,
        START_PAGE.id,
        ContentRef::ROOT,
        "StartPage",
        Some("en"),
        props(&[("SettingsFolder", PropertyValue::Reference(SETTINGS_FOLDER))]),
    );
    publish(
        store,
        SETTINGS_FOLDER.id,
        START_PAGE,
        "SettingsFolder",
        None,
        BTreeMap::new(),
    );
    publish(
        store,
        LAYOUT.id,
        SETTINGS_FOLDER,
        "LayoutSettings",
        Some("en"),
        props(&[("NumberOfHits", PropertyValue::Integer(5))]),
    );
}

pub struct Site {
    pub store: Arc<InMemoryContentStore>,
    pub cache: Arc<MemoryObjectCache>,
    pub keys: Arc<dyn ContentCacheKeyCreator>,
    pub service: SettingsService,
}

pub fn site() -> Site {
    site_with(InMemoryContentStore::new(types()), CacheConfig::default())
}

/// Wire a service over `store`, seeding the standard site first.
pub fn site_with(store: InMemoryContentStore, config: CacheConfig) -> Site {
    seed_site(&store);
    let store = Arc::new(store);
    let cache = Arc::new(MemoryObjectCache::new(&config));
    let creator = Arc::new(DefaultCacheKeyCreator::new());
    store.subscribe(Arc::new(VersionInvalidator::new(
        Arc::clone(&cache),
        Arc::clone(&creator),
    )));
    let keys: Arc<dyn ContentCacheKeyCreator> = creator;

    let service = SettingsService::from_store(
        Arc::clone(&store),
        cache.clone(),
        Arc::clone(&keys),
    );
    Site {
        store,
        cache,
        keys,
        service,
    }
}
