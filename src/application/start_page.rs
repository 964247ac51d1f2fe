//! Maps any content item to the start page of the site that owns it.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error};
use uuid::Uuid;

use crate::application::error::SettingsError;
use crate::application::repos::{ContentRepo, ContentTypeRepo};
use crate::domain::content::ContentRef;
use crate::domain::schema::{ContentType, START_PAGE_TYPE};

const SOURCE: &str = "application::start_page::StartPageResolver";

pub struct StartPageResolver {
    content: Arc<dyn ContentRepo>,
    content_types: Arc<dyn ContentTypeRepo>,
    start_page_type: OnceCell<ContentType>,
}

impl StartPageResolver {
    pub fn new(content: Arc<dyn ContentRepo>, content_types: Arc<dyn ContentTypeRepo>) -> Self {
        Self {
            content,
            content_types,
            start_page_type: OnceCell::new(),
        }
    }

    /// Resolve the start page owning `page`: the page itself when it is a
    /// start page directly under the root, otherwise the root's child on the
    /// ancestor chain if that child is a start page.
    pub async fn resolve_by_reference(&self, page: ContentRef) -> Option<ContentRef> {
        match self.try_resolve_by_reference(page).await {
            Ok(start_page) => start_page,
            Err(err) => {
                error!(
                    target_module = SOURCE,
                    op = "resolve_by_reference",
                    page = %page,
                    error = %err,
                    "Failed to resolve start page"
                );
                None
            }
        }
    }

    /// Resolve the start page owning the item with the given stable identifier.
    pub async fn resolve_by_guid(&self, guid: Uuid) -> Option<ContentRef> {
        let item = match self.content.get_by_guid(guid).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!(%guid, "No content with guid; no start page");
                return None;
            }
            Err(err) => {
                error!(
                    target_module = SOURCE,
                    op = "resolve_by_guid",
                    %guid,
                    error = %err,
                    "Failed to load content by guid"
                );
                return None;
            }
        };

        self.resolve_by_reference(item.link).await
    }

    async fn try_resolve_by_reference(
        &self,
        page: ContentRef,
    ) -> Result<Option<ContentRef>, SettingsError> {
        if page.is_empty() {
            return Err(SettingsError::InvalidReference(page));
        }

        let start_page_type = self.start_page_type().await?;

        let Some(item) = self.content.get(page, None).await? else {
            debug!(page = %page, "Content not found; no start page");
            return Ok(None);
        };

        if item.parent == Some(ContentRef::ROOT) && item.content_type == start_page_type.id {
            return Ok(Some(page));
        }

        let ancestors = self.content.ancestors(page).await?;
        if ancestors.len() < 2 {
            return Ok(None);
        }

        // Leaf-to-root order: the root is last, its direct child just before it.
        let candidate = &ancestors[ancestors.len() - 2];
        if candidate.content_type == start_page_type.id {
            Ok(Some(candidate.link))
        } else {
            debug!(
                page = %page,
                candidate = %candidate.link,
                "Top-level ancestor is not a start page"
            );
            Ok(None)
        }
    }

    /// The start page type, loaded once. A failed or empty lookup is retried
    /// on the next call.
    async fn start_page_type(&self) -> Result<&ContentType, SettingsError> {
        self.start_page_type
            .get_or_try_init(|| async {
                self.content_types
                    .load(START_PAGE_TYPE)
                    .await?
                    .ok_or(SettingsError::MissingStartPageType)
            })
            .await
    }
}
