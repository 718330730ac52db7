use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// JSON body returned for every error. `code` is the stable
/// machine-readable tag clients switch on; `error` is the HTTP status
/// category.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A supplied foreign key does not resolve to an existing row.
    #[error("Unknown reference: {0}")]
    ReferenceError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::ReferenceError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidTransition(_) | Self::InsufficientStock(_) => {
                StatusCode::CONFLICT
            }
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::CacheError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag carried in the response body so the
    /// transport can distinguish every taxon even when statuses collide.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::ReferenceError(_) => "reference_error",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::AuthError(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::CacheError(_) => "cache_error",
            Self::SerializationError(_) => "serialization_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Internal failures return a generic message instead of leaking store
    /// or connectivity detail.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_)
            | Self::CacheError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Error type returned by HTTP handlers. Thin wrapper so handler-level
/// failures (payload validation, missing auth) stay distinct from service
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(err) => err.into_response(),
            ApiError::ValidationError(msg) => {
                ServiceError::ValidationError(msg).into_response()
            }
            ApiError::Unauthorized => {
                ServiceError::AuthError("Missing or invalid credentials".to_string())
                    .into_response()
            }
        }
    }
}
