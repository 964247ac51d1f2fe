//! Site settings resolution.
//!
//! Settings of type `T` for a site live in the settings folder referenced by
//! the site's start page. Resolution picks the draft or language variant the
//! request needs and caches it until the start page or the settings item
//! changes version. Settings are optional: every failure is logged and
//! reported as "not configured".

use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::context::RequestContext;
use crate::application::error::SettingsError;
use crate::application::repos::{ContentRepo, ContentRootRepo, ContentTypeRepo, VersionRepo};
use crate::application::start_page::StartPageResolver;
use crate::cache::lock::{rw_read, rw_write};
use crate::cache::{
    CachedObject, ContentCacheKeyCreator, DependencyKey, EvictionPolicy, ObjectCache,
    site_settings_cache_key,
};
use crate::domain::content::{ContentItem, ContentRef, LanguageTag};
use crate::domain::schema::SETTINGS_FOLDER_TYPE;
use crate::domain::settings::{
    SETTINGS_FOLDER_PROPERTY, SETTINGS_ROOT_GUID, SETTINGS_ROOT_NAME, SettingsContent,
    SiteSettings,
};

const SOURCE: &str = "application::settings::SettingsService";

/// Cache value: the settings plus the version keys they were loaded under.
struct CachedSettings<T> {
    settings: Arc<SettingsContent<T>>,
    policy: EvictionPolicy,
}

struct LoadedSettings<T> {
    settings: SettingsContent<T>,
    policy: EvictionPolicy,
}

pub struct SettingsService {
    content: Arc<dyn ContentRepo>,
    versions: Arc<dyn VersionRepo>,
    roots: Arc<dyn ContentRootRepo>,
    cache: Arc<dyn ObjectCache>,
    cache_keys: Arc<dyn ContentCacheKeyCreator>,
    start_pages: StartPageResolver,
    global_settings_root: RwLock<Option<ContentRef>>,
}

impl SettingsService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        versions: Arc<dyn VersionRepo>,
        content_types: Arc<dyn ContentTypeRepo>,
        roots: Arc<dyn ContentRootRepo>,
        cache: Arc<dyn ObjectCache>,
        cache_keys: Arc<dyn ContentCacheKeyCreator>,
    ) -> Self {
        Self {
            start_pages: StartPageResolver::new(Arc::clone(&content), content_types),
            content,
            versions,
            roots,
            cache,
            cache_keys,
            global_settings_root: RwLock::new(None),
        }
    }

    /// Build a service over a single store implementing every content collaborator.
    pub fn from_store<S>(
        store: Arc<S>,
        cache: Arc<dyn ObjectCache>,
        cache_keys: Arc<dyn ContentCacheKeyCreator>,
    ) -> Self
    where
        S: ContentRepo + VersionRepo + ContentTypeRepo + ContentRootRepo + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            cache,
            cache_keys,
        )
    }

    pub fn start_pages(&self) -> &StartPageResolver {
        &self.start_pages
    }

    /// The global settings root recorded by [`SettingsService::initialize`].
    ///
    /// `None` until initialization has completed (or when it failed).
    pub fn global_settings_root(&self) -> Option<ContentRef> {
        *rw_read(&self.global_settings_root, SOURCE, "global_settings_root")
    }

    /// Resolve settings of type `T` for the site rooted at `start_page`.
    ///
    /// `language` defaults to the request's preferred language. Returns `None`
    /// when the site has no such settings or anything goes wrong on the way.
    pub async fn resolve<T: SiteSettings>(
        &self,
        start_page: ContentRef,
        language: Option<&LanguageTag>,
        ctx: &RequestContext,
    ) -> Option<Arc<SettingsContent<T>>> {
        match self.try_resolve::<T>(start_page, language, ctx).await {
            Ok(settings) => settings,
            Err(err) => {
                error!(
                    target_module = SOURCE,
                    op = "resolve",
                    start_page = %start_page,
                    settings_type = T::CONTENT_TYPE,
                    error = %err,
                    "Failed to resolve site settings"
                );
                None
            }
        }
    }

    /// Resolve settings of type `T` for the request's current site.
    ///
    /// Unlike [`SettingsService::resolve`], a request without a current site
    /// is an error rather than "not configured".
    pub async fn resolve_current<T: SiteSettings>(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Arc<SettingsContent<T>>>, SettingsError> {
        let site = ctx.site.as_ref().ok_or(SettingsError::NoCurrentSite)?;
        Ok(self.resolve::<T>(site.start_page, None, ctx).await)
    }

    async fn try_resolve<T: SiteSettings>(
        &self,
        start_page: ContentRef,
        language: Option<&LanguageTag>,
        ctx: &RequestContext,
    ) -> Result<Option<Arc<SettingsContent<T>>>, SettingsError> {
        if start_page.is_empty() {
            return Err(SettingsError::InvalidReference(start_page));
        }

        let language = language.unwrap_or(&ctx.preferred_language);
        let is_draft = ctx.is_draft();
        let cache_key = site_settings_cache_key(start_page, T::CONTENT_TYPE, is_draft, language);

        if let Some(cached) = self.cache.get(&cache_key) {
            match cached.downcast::<CachedSettings<T>>() {
                Ok(entry) => {
                    let current =
                        self.eviction_policy(start_page, entry.settings.content_link, is_draft);
                    if entry.policy == current {
                        debug!(cache_key = %cache_key, "Site settings cache hit");
                        return Ok(Some(Arc::clone(&entry.settings)));
                    }
                    debug!(
                        cache_key = %cache_key,
                        "Cached site settings outlived their content version; reloading"
                    );
                }
                Err(_) => warn!(
                    target_module = SOURCE,
                    cache_key = %cache_key,
                    expected = T::CONTENT_TYPE,
                    "Cached site settings had an unexpected type; reloading"
                ),
            }
        }

        let Some(loaded) = self.try_load::<T>(start_page, is_draft, language).await? else {
            return Ok(None);
        };

        let settings = Arc::new(loaded.settings);
        let value: CachedObject = Arc::new(CachedSettings {
            settings: Arc::clone(&settings),
            policy: loaded.policy.clone(),
        });
        self.cache.insert(cache_key, value, loaded.policy);

        Ok(Some(settings))
    }

    fn eviction_policy(
        &self,
        start_page: ContentRef,
        settings: ContentRef,
        is_draft: bool,
    ) -> EvictionPolicy {
        EvictionPolicy::new([
            self.dependency_key(start_page, is_draft),
            self.dependency_key(settings, is_draft),
        ])
    }

    fn dependency_key(&self, link: ContentRef, is_draft: bool) -> DependencyKey {
        if is_draft {
            self.cache_keys.version_common_cache_key(link)
        } else {
            self.cache_keys.common_cache_key(link)
        }
    }

    /// Load settings of type `T` from the content store, bypassing the cache.
    ///
    /// Picks, in order: the shared draft (when `is_draft`), the `language`
    /// variant, then the settings item as stored.
    pub async fn load<T: SiteSettings>(
        &self,
        start_page: ContentRef,
        is_draft: bool,
        language: &LanguageTag,
    ) -> Option<SettingsContent<T>> {
        match self.try_load::<T>(start_page, is_draft, language).await {
            Ok(loaded) => loaded.map(|loaded| loaded.settings),
            Err(err) => {
                error!(
                    target_module = SOURCE,
                    op = "load",
                    start_page = %start_page,
                    settings_type = T::CONTENT_TYPE,
                    language = %language,
                    is_draft,
                    error = %err,
                    "Failed to load site settings"
                );
                None
            }
        }
    }

    /// Dependency keys are derived before the content they guard is read, so
    /// a version published mid-load leaves the entry with superseded keys.
    async fn try_load<T: SiteSettings>(
        &self,
        start_page: ContentRef,
        is_draft: bool,
        language: &LanguageTag,
    ) -> Result<Option<LoadedSettings<T>>, SettingsError> {
        if start_page.is_empty() {
            return Err(SettingsError::InvalidReference(start_page));
        }

        let start_key = self.dependency_key(start_page, is_draft);
        let start = match self.content.get(start_page, Some(language)).await? {
            Some(item) => Some(item),
            None => self.content.get(start_page, None).await?,
        };
        let Some(start) = start else {
            debug!(start_page = %start_page, "Start page not found");
            return Ok(None);
        };

        let Some(folder) = start.reference_property(SETTINGS_FOLDER_PROPERTY) else {
            debug!(start_page = %start_page, "Start page has no settings folder");
            return Ok(None);
        };

        let Some(found) = self
            .content
            .children_of_type(folder, T::CONTENT_TYPE)
            .await?
            .into_iter()
            .next()
        else {
            debug!(
                folder = %folder,
                settings_type = T::CONTENT_TYPE,
                "Settings folder holds no settings of this type"
            );
            return Ok(None);
        };

        let policy = EvictionPolicy::new([start_key, self.dependency_key(found.link, is_draft)]);
        let loaded = |item: &ContentItem| -> Result<Option<LoadedSettings<T>>, SettingsError> {
            Ok(Some(LoadedSettings {
                settings: SettingsContent::from_content(item)?,
                policy: policy.clone(),
            }))
        };

        if is_draft {
            if let Some(draft) = self
                .versions
                .load_common_draft(found.link, language)
                .await?
            {
                match self.content.get(draft.content_link, None).await? {
                    Some(item) => return loaded(&item),
                    None => debug!(
                        draft = %draft.content_link,
                        "Common draft listed but not loadable; using published settings"
                    ),
                }
            }
        }

        if found.has_language(language) {
            if let Some(item) = self.content.get(found.link, Some(language)).await? {
                return loaded(&item);
            }
        }

        match self.content.get(found.link, None).await? {
            Some(item) => loaded(&item),
            None => {
                debug!(settings = %found.link, "Settings item disappeared while loading");
                Ok(None)
            }
        }
    }

    /// Make sure the global settings root exists and remember its reference.
    ///
    /// Idempotent. Failures are logged; the site keeps running without
    /// settings support.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        if let Err(err) = self.register_content_roots().await {
            error!(
                target_module = SOURCE,
                op = "initialize",
                error = %err,
                "Failed to initialize settings root; continuing without site settings"
            );
        }
    }

    async fn register_content_roots(&self) -> Result<(), SettingsError> {
        let registered = self.content.get_items(&self.roots.list().await?).await?;
        let exists = registered
            .iter()
            .any(|root| root.guid == SETTINGS_ROOT_GUID && root.name == SETTINGS_ROOT_NAME);

        if !exists {
            let link = self
                .roots
                .register(
                    SETTINGS_FOLDER_TYPE,
                    SETTINGS_ROOT_NAME,
                    SETTINGS_ROOT_GUID,
                    ContentRef::ROOT,
                )
                .await?;
            info!(root = %link, "Registered settings root");
        }

        let root = self
            .content
            .get_items(&self.roots.list().await?)
            .await?
            .into_iter()
            .find(|root| root.guid == SETTINGS_ROOT_GUID);

        match root {
            Some(root) => {
                *rw_write(&self.global_settings_root, SOURCE, "initialize") = Some(root.link);
            }
            None => warn!(
                guid = %SETTINGS_ROOT_GUID,
                "Settings root missing after registration"
            ),
        }
        Ok(())
    }

    pub async fn resolve_start_page_by_reference(&self, page: ContentRef) -> Option<ContentRef> {
        self.start_pages.resolve_by_reference(page).await
    }

    pub async fn resolve_start_page_by_guid(&self, guid: Uuid) -> Option<ContentRef> {
        self.start_pages.resolve_by_guid(guid).await
    }
}
