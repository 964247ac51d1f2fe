//! In-process content store.
//!
//! Implements every content collaborator the resolvers need, over language
//! variants held in memory. Published changes and draft saves are reported
//! to subscribed [`ContentChangeObserver`]s after the store lock is released.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    ContentRepo, ContentRootRepo, ContentTypeRepo, RepoError, VersionRepo,
};
use crate::cache::ContentChangeObserver;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::content::{
    ContentItem, ContentRef, ContentTypeId, ContentVersion, LanguageTag, PropertyValue,
    VersionStatus,
};
use crate::domain::schema::{ContentType, FrozenContentTypeRegistry};

const SOURCE: &str = "infra::memory::InMemoryContentStore";

const ROOT_NAME: &str = "Root";
const ROOT_GUID: Uuid = Uuid::from_u128(0x43f936c9_9b23_4ea3_97b2_61c538ad07c9);

#[async_trait]
impl ContentTypeRepo for FrozenContentTypeRegistry {
    async fn load(&self, name: &str) -> Result<Option<ContentType>, RepoError> {
        Ok(self.get(name))
    }
}

/// Language variants of one content item; the first is the master variant.
#[derive(Debug, Clone)]
struct StoredContent {
    variants: Vec<ContentItem>,
}

impl StoredContent {
    fn master(&self) -> Option<&ContentItem> {
        self.variants.first()
    }

    fn variant(&self, language: &LanguageTag) -> Option<&ContentItem> {
        self.variants
            .iter()
            .find(|variant| variant.language.as_ref() == Some(language))
    }

    fn upsert(&mut self, item: ContentItem) {
        match self
            .variants
            .iter_mut()
            .find(|variant| variant.language == item.language)
        {
            Some(existing) => *existing = item,
            None => self.variants.push(item),
        }

        let languages: Vec<LanguageTag> = self
            .variants
            .iter()
            .filter_map(|variant| variant.language.clone())
            .collect();
        for variant in &mut self.variants {
            variant.existing_languages = languages.clone();
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    items: BTreeMap<u64, StoredContent>,
    /// Draft versions keyed by work id.
    versions: HashMap<u64, ContentItem>,
    /// Shared draft per content id and lowercased language.
    common_drafts: HashMap<(u64, String), u64>,
    roots: Vec<ContentRef>,
    next_work_id: u64,
}

impl StoreState {
    fn next_content_id(&self) -> u64 {
        self.items
            .keys()
            .next_back()
            .map_or(ContentRef::ROOT.id + 1, |id| id + 1)
    }

    fn master(&self, id: u64) -> Option<&ContentItem> {
        self.items.get(&id).and_then(StoredContent::master)
    }
}

pub struct InMemoryContentStore {
    types: Arc<FrozenContentTypeRegistry>,
    state: RwLock<StoreState>,
    observers: RwLock<Vec<Arc<dyn ContentChangeObserver>>>,
    root_registration_enabled: bool,
}

impl InMemoryContentStore {
    /// Create a store holding only the global root.
    pub fn new(types: Arc<FrozenContentTypeRegistry>) -> Self {
        let root = ContentItem {
            link: ContentRef::ROOT,
            guid: ROOT_GUID,
            name: ROOT_NAME.to_string(),
            parent: None,
            content_type: ContentTypeId::SYSTEM_ROOT,
            language: None,
            existing_languages: Vec::new(),
            properties: BTreeMap::new(),
        };

        let mut state = StoreState {
            next_work_id: 1,
            ..StoreState::default()
        };
        state.items.insert(
            ContentRef::ROOT.id,
            StoredContent {
                variants: vec![root],
            },
        );
        state.roots.push(ContentRef::ROOT);

        Self {
            types,
            state: RwLock::new(state),
            observers: RwLock::new(Vec::new()),
            root_registration_enabled: true,
        }
    }

    /// Refuse [`ContentRootRepo::register`], like a read-only content replica.
    pub fn without_root_registration(mut self) -> Self {
        self.root_registration_enabled = false;
        self
    }

    pub fn content_types(&self) -> &FrozenContentTypeRegistry {
        &self.types
    }

    pub fn subscribe(&self, observer: Arc<dyn ContentChangeObserver>) {
        rw_write(&self.observers, SOURCE, "subscribe").push(observer);
    }

    /// Publish a language variant of an item, creating the item if needed.
    ///
    /// Publishing replaces any shared draft of the same language.
    pub fn publish(&self, mut item: ContentItem) -> Result<ContentRef, RepoError> {
        let link = item.link.to_version_agnostic();
        if link.is_empty() || link == ContentRef::ROOT {
            return Err(RepoError::invalid_input(format!(
                "cannot publish content with reference `{}`",
                item.link
            )));
        }
        if self.types.by_id(item.content_type).is_none() {
            return Err(RepoError::invalid_input(format!(
                "content {link} has unknown content type {}",
                item.content_type.0
            )));
        }
        item.link = link;

        {
            let mut state = rw_write(&self.state, SOURCE, "publish");

            let Some(parent) = item.parent else {
                return Err(RepoError::invalid_input(format!(
                    "content {link} must have a parent"
                )));
            };
            if !state.items.contains_key(&parent.id) {
                return Err(RepoError::invalid_input(format!(
                    "parent {parent} of content {link} does not exist"
                )));
            }
            let guid_taken = state
                .items
                .iter()
                .filter(|(id, _)| **id != link.id)
                .filter_map(|(_, stored)| stored.master())
                .any(|other| other.guid == item.guid);
            if guid_taken {
                return Err(RepoError::invalid_input(format!(
                    "guid {} is already used by another item",
                    item.guid
                )));
            }

            if let Some(language) = item.language.as_ref() {
                let draft_key = (link.id, language.as_str().to_ascii_lowercase());
                if let Some(work_id) = state.common_drafts.remove(&draft_key) {
                    state.versions.remove(&work_id);
                }
            }

            state
                .items
                .entry(link.id)
                .or_insert_with(|| StoredContent {
                    variants: Vec::new(),
                })
                .upsert(item);
        }

        debug!(content = %link, "Published content");
        self.notify(|observer| observer.content_published(link));
        Ok(link)
    }

    /// Save the shared draft of `link` in `language` with new property values.
    ///
    /// The draft starts from the existing draft, else the published variant
    /// in `language`, else the master variant. Returns the draft's
    /// version-specific reference.
    pub fn save_draft(
        &self,
        link: ContentRef,
        language: &LanguageTag,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<ContentRef, RepoError> {
        let link = link.to_version_agnostic();
        let draft_link = {
            let mut state = rw_write(&self.state, SOURCE, "save_draft");
            let draft_key = (link.id, language.as_str().to_ascii_lowercase());

            let mut draft = match state
                .common_drafts
                .get(&draft_key)
                .and_then(|work_id| state.versions.get(work_id))
            {
                Some(existing) => existing.clone(),
                None => {
                    let stored = state.items.get(&link.id).ok_or(RepoError::NotFound(link))?;
                    stored
                        .variant(language)
                        .or_else(|| stored.master())
                        .cloned()
                        .ok_or(RepoError::NotFound(link))?
                }
            };

            let work_id = match state.common_drafts.get(&draft_key) {
                Some(work_id) => *work_id,
                None => {
                    let work_id = state.next_work_id;
                    state.next_work_id += 1;
                    work_id
                }
            };

            draft.link = ContentRef::with_work_id(link.id, work_id);
            draft.language = Some(language.clone());
            draft.properties.extend(properties);

            state.common_drafts.insert(draft_key, work_id);
            state.versions.insert(work_id, draft);
            ContentRef::with_work_id(link.id, work_id)
        };

        debug!(content = %link, draft = %draft_link, "Saved common draft");
        self.notify(|observer| observer.draft_saved(link));
        Ok(draft_link)
    }

    fn notify(&self, event: impl Fn(&dyn ContentChangeObserver)) {
        let observers = rw_read(&self.observers, SOURCE, "notify").clone();
        for observer in observers {
            event(observer.as_ref());
        }
    }
}

#[async_trait]
impl ContentRepo for InMemoryContentStore {
    async fn get(
        &self,
        link: ContentRef,
        language: Option<&LanguageTag>,
    ) -> Result<Option<ContentItem>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "get");

        if link.is_version_specific() {
            return Ok(state
                .versions
                .get(&link.work_id)
                .filter(|draft| draft.link.id == link.id)
                .cloned());
        }

        let Some(stored) = state.items.get(&link.id) else {
            return Ok(None);
        };
        Ok(match language {
            Some(language) => stored.variant(language).cloned(),
            None => stored.master().cloned(),
        })
    }

    async fn get_by_guid(&self, guid: Uuid) -> Result<Option<ContentItem>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "get_by_guid");
        Ok(state
            .items
            .values()
            .filter_map(StoredContent::master)
            .find(|item| item.guid == guid)
            .cloned())
    }

    /// Children are returned in ascending content id order.
    async fn children_of_type(
        &self,
        folder: ContentRef,
        content_type: &str,
    ) -> Result<Vec<ContentItem>, RepoError> {
        let Some(content_type) = self.types.get(content_type) else {
            debug!(content_type, "Unknown content type; no children");
            return Ok(Vec::new());
        };

        let folder = folder.to_version_agnostic();
        let state = rw_read(&self.state, SOURCE, "children_of_type");
        Ok(state
            .items
            .values()
            .filter_map(StoredContent::master)
            .filter(|item| item.parent == Some(folder) && item.content_type == content_type.id)
            .cloned()
            .collect())
    }

    async fn ancestors(&self, link: ContentRef) -> Result<Vec<ContentItem>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "ancestors");
        let item = state.master(link.id).ok_or(RepoError::NotFound(link))?;

        let mut ancestors = Vec::new();
        let mut next = item.parent;
        while let Some(parent) = next {
            if ancestors.len() > state.items.len() {
                return Err(RepoError::from_persistence(format!(
                    "parent chain of {link} does not terminate"
                )));
            }
            let parent = state
                .master(parent.id)
                .ok_or(RepoError::NotFound(parent))?;
            next = parent.parent;
            ancestors.push(parent.clone());
        }
        Ok(ancestors)
    }

    async fn get_items(&self, links: &[ContentRef]) -> Result<Vec<ContentItem>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "get_items");
        Ok(links
            .iter()
            .filter_map(|link| state.master(link.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VersionRepo for InMemoryContentStore {
    async fn load_common_draft(
        &self,
        link: ContentRef,
        language: &LanguageTag,
    ) -> Result<Option<ContentVersion>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "load_common_draft");
        let key = (link.id, language.as_str().to_ascii_lowercase());
        Ok(state
            .common_drafts
            .get(&key)
            .map(|work_id| ContentVersion {
                content_link: ContentRef::with_work_id(link.id, *work_id),
                language: language.clone(),
                status: VersionStatus::CheckedOut,
            }))
    }
}

#[async_trait]
impl ContentTypeRepo for InMemoryContentStore {
    async fn load(&self, name: &str) -> Result<Option<ContentType>, RepoError> {
        self.types.load(name).await
    }
}

#[async_trait]
impl ContentRootRepo for InMemoryContentStore {
    async fn list(&self) -> Result<Vec<ContentRef>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "list_roots").roots.clone())
    }

    async fn register(
        &self,
        content_type: &str,
        name: &str,
        guid: Uuid,
        parent: ContentRef,
    ) -> Result<ContentRef, RepoError> {
        if !self.root_registration_enabled {
            return Err(RepoError::not_supported("content roots are read-only"));
        }
        let content_type = self.types.get(content_type).ok_or_else(|| {
            RepoError::invalid_input(format!("unknown content type `{content_type}`"))
        })?;

        let mut state = rw_write(&self.state, SOURCE, "register_root");
        if !state.items.contains_key(&parent.id) {
            return Err(RepoError::NotFound(parent));
        }

        let link = ContentRef::new(state.next_content_id());
        let item = ContentItem {
            link,
            guid,
            name: name.to_string(),
            parent: Some(parent.to_version_agnostic()),
            content_type: content_type.id,
            language: None,
            existing_languages: Vec::new(),
            properties: BTreeMap::new(),
        };
        state.items.insert(
            link.id,
            StoredContent {
                variants: vec![item],
            },
        );
        state.roots.push(link);

        info!(root = %link, name, "Registered content root");
        Ok(link)
    }
}
