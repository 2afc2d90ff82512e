//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors produced by the retrieval and orchestration services.
///
/// The taxonomy mirrors how failures surface at the HTTP boundary:
/// [`Validation`](ServiceError::Validation) becomes a client error, everything
/// else is a server-side failure whose originating message is passed through
/// unchanged. There is no local recovery anywhere; callers propagate with `?`
/// and the entry point converts the error into a JSON response exactly once.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller input was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A required credential or environment value is absent.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// A vendor API call failed: non-2xx status, timeout, or transport error.
    #[error("upstream failure ({service}): {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// The backing store rejected or failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
