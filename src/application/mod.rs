//! Settings resolution services and the collaborator seams they depend on.

pub mod context;
pub mod error;
pub mod repos;
pub mod search;
pub mod settings;
pub mod start_page;
