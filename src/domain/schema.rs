//! Content type schema.
//!
//! Content types are tagged variants with display metadata and a stable
//! identity. Definitions are validated when registered and then frozen into
//! an immutable registry that the content store and resolvers look types up
//! in.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::content::ContentTypeId;
use crate::domain::error::DomainError;
use crate::domain::settings::{LayoutSettings, SiteSettings};

pub const START_PAGE_TYPE: &str = "StartPage";
pub const SETTINGS_FOLDER_TYPE: &str = "SettingsFolder";

const START_PAGE_GUID: Uuid = Uuid::from_u128(0x3e8a9c41_52b7_4f0d_9a57_2c1e6b0f8d14);
const SETTINGS_FOLDER_GUID: Uuid = Uuid::from_u128(0xc709627f_ca9f_4c77_b0fb_8563287ebd93);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    StartPage,
    SettingsFolder { folder_name: Option<String> },
    Settings { settings_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentTypeDefinition {
    pub name: String,
    pub display_name: String,
    pub guid: Uuid,
    pub description: Option<String>,
    pub available_in_edit_mode: bool,
    pub kind: ContentKind,
}

/// Descriptor handed out once a definition has been registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentType {
    pub id: ContentTypeId,
    pub name: String,
    pub guid: Uuid,
    pub kind: ContentKind,
}

pub struct ContentTypeRegistry {
    definitions: HashMap<String, (ContentTypeId, ContentTypeDefinition)>,
    next_id: u32,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a content type definition.
    pub fn register(
        &mut self,
        definition: ContentTypeDefinition,
    ) -> Result<ContentTypeId, DomainError> {
        validate(&definition)?;

        if self.definitions.contains_key(&definition.name) {
            return Err(DomainError::schema(
                &definition.name,
                "a content type with this name is already registered",
            ));
        }
        if let Some((_, (_, existing))) = self
            .definitions
            .iter()
            .find(|(_, (_, existing))| existing.guid == definition.guid)
        {
            return Err(DomainError::schema(
                &definition.name,
                format!("guid {} is already used by `{}`", definition.guid, existing.name),
            ));
        }

        let id = ContentTypeId(self.next_id);
        self.next_id += 1;
        debug!(content_type = %definition.name, id = id.0, "Registering content type");
        self.definitions
            .insert(definition.name.clone(), (id, definition));
        Ok(id)
    }

    /// Freeze the registry (make it immutable)
    pub fn freeze(self) -> FrozenContentTypeRegistry {
        info!(
            count = self.definitions.len(),
            "Freezing content type registry"
        );
        FrozenContentTypeRegistry {
            definitions: self.definitions,
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(definition: &ContentTypeDefinition) -> Result<(), DomainError> {
    let name = definition.name.trim();
    if name.is_empty() {
        return Err(DomainError::schema(&definition.name, "name must not be empty"));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(DomainError::schema(
            &definition.name,
            "name must be an identifier",
        ));
    }
    if definition.guid.is_nil() {
        return Err(DomainError::schema(&definition.name, "guid must not be nil"));
    }
    if let ContentKind::Settings { settings_name } = &definition.kind {
        if settings_name.trim().is_empty() {
            return Err(DomainError::schema(
                &definition.name,
                "settings types must carry a settings name",
            ));
        }
    }
    Ok(())
}

pub struct FrozenContentTypeRegistry {
    definitions: HashMap<String, (ContentTypeId, ContentTypeDefinition)>,
}

impl FrozenContentTypeRegistry {
    pub fn get(&self, name: &str) -> Option<ContentType> {
        self.definitions.get(name).map(|(id, definition)| ContentType {
            id: *id,
            name: definition.name.clone(),
            guid: definition.guid,
            kind: definition.kind.clone(),
        })
    }

    pub fn definition(&self, name: &str) -> Option<&ContentTypeDefinition> {
        self.definitions.get(name).map(|(_, definition)| definition)
    }

    pub fn by_id(&self, id: ContentTypeId) -> Option<&ContentTypeDefinition> {
        self.definitions
            .values()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, definition)| definition)
    }

    /// Settings types that editors can create, sorted by display name.
    pub fn settings_types(&self) -> Vec<&ContentTypeDefinition> {
        let mut settings: Vec<_> = self
            .definitions
            .values()
            .map(|(_, definition)| definition)
            .filter(|definition| matches!(definition.kind, ContentKind::Settings { .. }))
            .collect();
        settings.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        settings
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

pub fn start_page_definition() -> ContentTypeDefinition {
    ContentTypeDefinition {
        name: START_PAGE_TYPE.to_string(),
        display_name: "Start Page".to_string(),
        guid: START_PAGE_GUID,
        description: Some("Root-level entry point of a site".to_string()),
        available_in_edit_mode: true,
        kind: ContentKind::StartPage,
    }
}

pub fn settings_folder_definition() -> ContentTypeDefinition {
    ContentTypeDefinition {
        name: SETTINGS_FOLDER_TYPE.to_string(),
        display_name: "Settings Folder".to_string(),
        guid: SETTINGS_FOLDER_GUID,
        description: Some("Container for site settings".to_string()),
        available_in_edit_mode: true,
        kind: ContentKind::SettingsFolder {
            folder_name: Some("Settings".to_string()),
        },
    }
}

/// Registry with the start page, settings folder and every shipped settings type.
pub fn builtin_registry() -> Result<FrozenContentTypeRegistry, DomainError> {
    let mut registry = ContentTypeRegistry::new();
    registry.register(start_page_definition())?;
    registry.register(settings_folder_definition())?;
    registry.register(LayoutSettings::definition())?;
    Ok(registry.freeze())
}
