//! Search page model.
//!
//! Search itself is not available; the page still honours the configured
//! hit count so the layout renders consistently.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::application::context::RequestContext;
use crate::application::settings::SettingsService;
use crate::domain::settings::LayoutSettings;

const SOURCE: &str = "application::search::SearchPageService";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPageModel {
    pub hits: Vec<SearchHit>,
    pub number_of_hits: i32,
    pub search_service_disabled: bool,
    pub searched_query: String,
}

#[derive(Clone)]
pub struct SearchPageService {
    settings: Arc<SettingsService>,
}

impl SearchPageService {
    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self { settings }
    }

    pub async fn index(&self, query: &str, ctx: &RequestContext) -> SearchPageModel {
        let number_of_hits = match self.settings.resolve_current::<LayoutSettings>(ctx).await {
            Ok(Some(layout)) => layout.number_of_hits,
            Ok(None) => 0,
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    op = "index",
                    error = %err,
                    "Layout settings unavailable; using default hit count"
                );
                0
            }
        };

        SearchPageModel {
            hits: Vec::new(),
            number_of_hits,
            search_service_disabled: true,
            searched_query: query.to_string(),
        }
    }
}
