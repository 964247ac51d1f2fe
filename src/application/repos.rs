//! Collaborator traits describing the content store the resolvers read from.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::content::{ContentItem, ContentRef, ContentVersion, LanguageTag};
use crate::domain::schema::ContentType;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("content {0} not found")]
    NotFound(ContentRef),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("operation not supported: {message}")]
    NotSupported { message: String },
    #[error("content store timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Fetch an item. With a language, only that language variant is
    /// returned; without one, the master language variant. Version-specific
    /// references return exactly that version.
    async fn get(
        &self,
        link: ContentRef,
        language: Option<&LanguageTag>,
    ) -> Result<Option<ContentItem>, RepoError>;

    async fn get_by_guid(&self, guid: Uuid) -> Result<Option<ContentItem>, RepoError>;

    /// Children of `folder` whose content type is named `content_type`, in
    /// store order.
    async fn children_of_type(
        &self,
        folder: ContentRef,
        content_type: &str,
    ) -> Result<Vec<ContentItem>, RepoError>;

    /// Ancestors of `link`, nearest parent first and ending with the root.
    async fn ancestors(&self, link: ContentRef) -> Result<Vec<ContentItem>, RepoError>;

    /// Master language variants of the given items; unknown references are skipped.
    async fn get_items(&self, links: &[ContentRef]) -> Result<Vec<ContentItem>, RepoError>;
}

#[async_trait]
pub trait VersionRepo: Send + Sync {
    /// The draft every editor shares for `link` in `language`, if one exists.
    async fn load_common_draft(
        &self,
        link: ContentRef,
        language: &LanguageTag,
    ) -> Result<Option<ContentVersion>, RepoError>;
}

#[async_trait]
pub trait ContentTypeRepo: Send + Sync {
    async fn load(&self, name: &str) -> Result<Option<ContentType>, RepoError>;
}

#[async_trait]
pub trait ContentRootRepo: Send + Sync {
    async fn list(&self) -> Result<Vec<ContentRef>, RepoError>;

    async fn register(
        &self,
        content_type: &str,
        name: &str,
        guid: Uuid,
        parent: ContentRef,
    ) -> Result<ContentRef, RepoError>;
}
