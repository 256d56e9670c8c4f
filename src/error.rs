//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{AdminRequired, DomainError};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing X-API-Key header")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key is disabled")]
    ApiKeyDisabled,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<AdminRequired> for AppError {
    fn from(err: AdminRequired) -> Self {
        AppError::Forbidden(err.to_string())
    }
}

impl From<crate::repository::RepositoryError> for AppError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        AppError::Domain(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::MissingApiKey => (StatusCode::UNAUTHORIZED, "missing_api_key", None),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key", None),
            AppError::ApiKeyDisabled => (StatusCode::UNAUTHORIZED, "api_key_disabled", None),

            // 403 Forbidden
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),

            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_failed", Some(msg.clone()))
                }
                DomainError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    not_found_code(entity),
                    Some(id.clone()),
                ),
                DomainError::Conflict(msg) => {
                    (StatusCode::CONFLICT, "conflict", Some(msg.clone()))
                }
                DomainError::Infrastructure(msg) => {
                    tracing::error!(error = %msg, "Infrastructure error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
            },
        };

        // Server-side detail stays in the logs
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

fn not_found_code(entity: &str) -> &'static str {
    match entity {
        "Game" => "game_not_found",
        "Promotion" => "promotion_not_found",
        "User" => "user_not_found",
        "LibraryEntry" => "library_entry_not_found",
        _ => "not_found",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_domain_error_status_mapping() {
        assert_eq!(
            status_of(DomainError::validation("bad").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::not_found("Game", "x").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::conflict("owned").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(status_of(AppError::MissingApiKey), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::InvalidApiKey), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AdminRequired { role: Role::User }.into()),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_not_found_codes() {
        assert_eq!(not_found_code("Game"), "game_not_found");
        assert_eq!(not_found_code("Widget"), "not_found");
    }
}
