//! TOML site fixtures loaded into the in-memory content store.
//!
//! ```toml
//! [[sites]]
//! name = "main"
//! start_page = 10
//!
//! [[content]]
//! id = 10
//! name = "Home"
//! parent = 1
//! content_type = "StartPage"
//! language = "en"
//! properties = { SettingsFolder = { id = 20 } }
//!
//! [[drafts]]
//! id = 21
//! language = "en"
//! properties = { NumberOfHits = 9 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::application::context::SiteDefinition;
use crate::domain::content::{ContentItem, ContentRef, LanguageTag, PropertyValue};
use crate::domain::schema::FrozenContentTypeRegistry;

use super::error::InfraError;
use super::memory::InMemoryContentStore;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SiteFixture {
    pub sites: Vec<FixtureSite>,
    pub content: Vec<FixtureContent>,
    pub drafts: Vec<FixtureDraft>,
    #[serde(skip)]
    origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSite {
    pub name: String,
    pub start_page: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureContent {
    pub id: u64,
    pub guid: Option<Uuid>,
    pub name: String,
    pub parent: u64,
    pub content_type: String,
    pub language: Option<LanguageTag>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureDraft {
    pub id: u64,
    pub language: LanguageTag,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Content store and site list built from a fixture.
pub struct LoadedSite {
    pub store: Arc<InMemoryContentStore>,
    pub sites: Vec<SiteDefinition>,
}

impl SiteFixture {
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::parse(&raw, &path.display().to_string())
    }

    pub fn parse(raw: &str, origin: &str) -> Result<Self, InfraError> {
        let mut fixture: SiteFixture =
            toml::from_str(raw).map_err(|err| InfraError::fixture(origin, err.to_string()))?;
        fixture.origin = origin.to_string();
        Ok(fixture)
    }

    /// Publish every item (in file order) and save every draft.
    pub fn into_store(
        self,
        types: Arc<FrozenContentTypeRegistry>,
    ) -> Result<LoadedSite, InfraError> {
        let origin = self.origin;
        let store = InMemoryContentStore::new(Arc::clone(&types));

        for content in self.content {
            let content_type = types.get(&content.content_type).ok_or_else(|| {
                InfraError::fixture(
                    origin.as_str(),
                    format!(
                        "content {} uses unknown content type `{}`",
                        content.id, content.content_type
                    ),
                )
            })?;

            let item = ContentItem {
                link: ContentRef::new(content.id),
                guid: content.guid.unwrap_or_else(Uuid::new_v4),
                name: content.name,
                parent: Some(ContentRef::new(content.parent)),
                content_type: content_type.id,
                language: content.language,
                existing_languages: Vec::new(),
                properties: content.properties,
            };
            store
                .publish(item)
                .map_err(|err| InfraError::fixture(origin.as_str(), err.to_string()))?;
        }

        for draft in self.drafts {
            store
                .save_draft(ContentRef::new(draft.id), &draft.language, draft.properties)
                .map_err(|err| InfraError::fixture(origin.as_str(), err.to_string()))?;
        }

        let sites: Vec<SiteDefinition> = self
            .sites
            .into_iter()
            .map(|site| SiteDefinition {
                name: site.name,
                start_page: ContentRef::new(site.start_page),
            })
            .collect();

        info!(fixture = %origin, sites = sites.len(), "Loaded site fixture");
        Ok(LoadedSite {
            store: Arc::new(store),
            sites,
        })
    }
}
