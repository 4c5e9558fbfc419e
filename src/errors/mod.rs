use std::io::Error as IoError;

use actix_web::{
    http::{header::RETRY_AFTER, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;

pub mod config;
pub mod repository;
pub mod service;

pub use config::ConfigError;
pub use repository::RepositoryError;
pub use service::ServiceError;

pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
    // Service-level domain errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict error: {0}")]
    Conflict(String),
    #[error("Not found error: {0}")]
    NotFound(String),
    /// Carries the number of seconds until the caller's window resets
    #[error("Too many requests: {}", TOO_MANY_REQUESTS_MESSAGE)]
    TooManyRequests(u64),
    #[error("Internal error: {0}")]
    Internal(String),
    // Infrastructure/system errors
    #[error("Server error: {0}")]
    Server(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Logger error: {0}")]
    Logger(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            RepositoryError::InvalidData(msg) => AppError::Validation(msg),
            RepositoryError::Database(err) => {
                log::error!("Database error: {}", err);
                AppError::Internal("A database error occurred".to_string())
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Unauthorized(msg) => AppError::Unauthorized(msg),
            ServiceError::Forbidden(msg) => AppError::Forbidden(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Internal(msg) => AppError::Internal(msg),
            ServiceError::Repository(err) => AppError::from(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(flatten_validation_errors(&errors))
    }
}

/// Flatten field errors into a single string
pub(crate) fn flatten_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut fields = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reasons = errs
                .iter()
                .map(|e| {
                    e.message
                        .clone()
                        .unwrap_or_else(|| e.code.clone())
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: {}", field, reasons)
        })
        .collect::<Vec<_>>();
    fields.sort();
    fields.join("; ")
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_)
            | AppError::Server(_)
            | AppError::Config(_)
            | AppError::Logger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_string = self.to_string();
        let (error_type, message) = error_string
            .split_once(':')
            .map(|(t, m)| (t.trim(), m.trim()))
            .unwrap_or(("Error", "An error occurred"));

        let error_message = if message.is_empty() {
            "An error occurred"
        } else {
            message
        };

        let code = self.status_code().as_u16();
        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::TooManyRequests(retry_after) = self {
            builder.insert_header((RETRY_AFTER, retry_after.to_string()));
        }
        builder.json(json!({
            "type": error_type.to_uppercase(),
            "message": error_message,
            "status_code": code,
        }))
    }
}
