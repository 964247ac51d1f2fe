use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("content type `{content_type}` rejected: {message}")]
    Schema {
        content_type: String,
        message: String,
    },
    #[error("content {content} cannot be read as `{settings_type}`: {message}")]
    Materialize {
        content: String,
        settings_type: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn schema(content_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            content_type: content_type.into(),
            message: message.into(),
        }
    }
}
