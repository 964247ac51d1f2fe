//! Site settings resolution for content-managed sites.
//!
//! Settings live as singleton content items inside a settings folder that a
//! site's start page points at. [`application::settings::SettingsService`]
//! finds the right language/draft variant and caches it with eviction tied to
//! the version identity of both the start page and the settings item.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
