use thiserror::Error;

use crate::{
    application::repos::RepoError, domain::content::ContentRef, domain::error::DomainError,
    infra::error::InfraError,
};

/// Failures inside settings resolution.
///
/// Apart from `NoCurrentSite`, these never reach callers of the resolver:
/// they are logged and turned into an absent result.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid start page reference `{0}`")]
    InvalidReference(ContentRef),
    #[error("start page type is not registered")]
    MissingStartPageType,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("no current site is configured for this request")]
    NoCurrentSite,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code reported by the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound => 3,
            AppError::Validation(_) | AppError::Domain(_) => 2,
            AppError::Settings(SettingsError::NoCurrentSite) => 2,
            AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Infra(_) | AppError::Settings(_) | AppError::Unexpected(_) => 1,
        }
    }
}
