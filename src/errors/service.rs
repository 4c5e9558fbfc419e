use thiserror::Error;

use super::RepositoryError;

/// Error type for service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller is not authenticated
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the role or ownership the action needs
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists or conflict occurred
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unrecoverable internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped repository error
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(super::flatten_validation_errors(&errors))
    }
}
