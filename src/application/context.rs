//! Per-request context threaded through settings resolution.

use serde::{Deserialize, Serialize};

use crate::domain::content::{ContentRef, LanguageTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    #[default]
    Normal,
    Edit,
}

/// A site served by the current process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDefinition {
    pub name: String,
    pub start_page: ContentRef,
}

/// Context mode, preferred content language and current site of a request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub mode: ContextMode,
    pub preferred_language: LanguageTag,
    pub site: Option<SiteDefinition>,
}

impl RequestContext {
    pub fn new(preferred_language: LanguageTag) -> Self {
        Self {
            mode: ContextMode::Normal,
            preferred_language,
            site: None,
        }
    }

    pub fn with_mode(mut self, mode: ContextMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_site(mut self, site: SiteDefinition) -> Self {
        self.site = Some(site);
        self
    }

    /// Editors see the shared draft rather than the published version.
    pub fn is_draft(&self) -> bool {
        self.mode == ContextMode::Edit
    }
}
