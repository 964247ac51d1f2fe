//! Typed site settings materialised from settings content items.

use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::content::{ContentItem, ContentRef, LanguageTag};
use crate::domain::error::DomainError;
use crate::domain::schema::{ContentKind, ContentTypeDefinition};

/// Name of the global settings root registered at startup.
pub const SETTINGS_ROOT_NAME: &str = "SettingsRoot";
/// Stable identity of the global settings root.
pub const SETTINGS_ROOT_GUID: Uuid = Uuid::from_u128(0x79611ee5_7ddd_4ac8_b00e_5e8e8d2a57ee);
/// Start page property holding the reference to the site's settings folder.
pub const SETTINGS_FOLDER_PROPERTY: &str = "SettingsFolder";

/// A settings content type: one canonical instance per settings folder.
///
/// Implementors deserialize from the item's property map, keyed by the
/// property names editors see.
pub trait SiteSettings: DeserializeOwned + Send + Sync + 'static {
    /// Content type name, also the last segment of the settings cache key.
    const CONTENT_TYPE: &'static str;

    fn definition() -> ContentTypeDefinition;
}

/// A resolved settings value together with the content version it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsContent<T> {
    pub content_link: ContentRef,
    pub language: Option<LanguageTag>,
    pub settings: T,
}

impl<T: SiteSettings> SettingsContent<T> {
    pub fn from_content(item: &ContentItem) -> Result<Self, DomainError> {
        let settings =
            serde_json::from_value(item.properties_json()).map_err(|err| {
                DomainError::Materialize {
                    content: item.link.to_string(),
                    settings_type: T::CONTENT_TYPE,
                    message: err.to_string(),
                }
            })?;

        Ok(Self {
            content_link: item.link,
            language: item.language.clone(),
            settings,
        })
    }
}

impl<T> Deref for SettingsContent<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.settings
    }
}

/// Layout options consumed by listing pages such as search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(rename = "NumberOfHits", default)]
    pub number_of_hits: i32,
}

impl SiteSettings for LayoutSettings {
    const CONTENT_TYPE: &'static str = "LayoutSettings";

    fn definition() -> ContentTypeDefinition {
        ContentTypeDefinition {
            name: Self::CONTENT_TYPE.to_string(),
            display_name: "Layout Settings".to_string(),
            guid: Uuid::from_u128(0x1cf3cd40_1845_4601_a898_5732e6574559),
            description: Some(
                "Data sources and in future menu builder and other site configuration"
                    .to_string(),
            ),
            available_in_edit_mode: true,
            kind: ContentKind::Settings {
                settings_name: "Layout Settings".to_string(),
            },
        }
    }
}
