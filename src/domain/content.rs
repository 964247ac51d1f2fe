//! Content references and items as handed out by the content store.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Reference to a content item, optionally pinned to a specific version.
///
/// A `work_id` of zero addresses the current (published) version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: u64,
    #[serde(default)]
    pub work_id: u64,
}

impl ContentRef {
    /// The invalid reference.
    pub const EMPTY: ContentRef = ContentRef { id: 0, work_id: 0 };
    /// The global content root every site hangs off.
    pub const ROOT: ContentRef = ContentRef { id: 1, work_id: 0 };

    pub const fn new(id: u64) -> Self {
        Self { id, work_id: 0 }
    }

    pub const fn with_work_id(id: u64, work_id: u64) -> Self {
        Self { id, work_id }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0
    }

    pub fn is_version_specific(&self) -> bool {
        self.work_id != 0
    }

    /// Drop the version pin, keeping the content identity.
    pub fn to_version_agnostic(self) -> Self {
        Self::new(self.id)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.work_id == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}_{}", self.id, self.work_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentTypeId(pub u32);

impl ContentTypeId {
    /// Type id carried by the global root, which has no registered type.
    pub const SYSTEM_ROOT: ContentTypeId = ContentTypeId(0);
}

/// Culture name such as `en` or `fr-CA`.
///
/// Stored as given, compared without regard to case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("language tag must not be empty"));
        }
        if !trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(DomainError::validation(format!(
                "language tag `{trimmed}` contains unsupported characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for LanguageTag {
    fn eq(&self, other: &Self) -> bool {
        self.eq_ignore_case(&other.0)
    }
}

impl Eq for LanguageTag {}

impl Hash for LanguageTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

/// Value of a single content property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
    Reference(ContentRef),
}

impl PropertyValue {
    pub fn as_reference(&self) -> Option<ContentRef> {
        match self {
            PropertyValue::Reference(link) => Some(*link),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Boolean(value) => Value::Bool(*value),
            PropertyValue::Integer(value) => Value::from(*value),
            PropertyValue::Text(value) => Value::String(value.clone()),
            PropertyValue::Reference(link) => serde_json::json!({
                "id": link.id,
                "work_id": link.work_id,
            }),
        }
    }
}

/// A single language variant (or draft version) of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub link: ContentRef,
    pub guid: Uuid,
    pub name: String,
    pub parent: Option<ContentRef>,
    pub content_type: ContentTypeId,
    pub language: Option<LanguageTag>,
    #[serde(default)]
    pub existing_languages: Vec<LanguageTag>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ContentItem {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Read a reference-valued property; empty references count as unset.
    pub fn reference_property(&self, name: &str) -> Option<ContentRef> {
        self.property(name)
            .and_then(PropertyValue::as_reference)
            .filter(|link| !link.is_empty())
    }

    pub fn has_language(&self, language: &LanguageTag) -> bool {
        self.existing_languages
            .iter()
            .any(|existing| existing == language)
    }

    /// Properties as a JSON object, the shape typed settings deserialize from.
    pub fn properties_json(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    CheckedOut,
    Published,
}

/// A version entry returned by the version repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub content_link: ContentRef,
    pub language: LanguageTag,
    pub status: VersionStatus,
}
