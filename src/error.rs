use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{auth::password::PasswordError, auth::TokenError, validation::ValidationErrors};

/// Why a request could not be tied to a user. Messages are fixed so callers learn nothing more.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token not provided")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid data")]
    ValidationError(ValidationErrors),
    #[error("Invalid ID")]
    InvalidId,
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error(transparent)]
    PasswordError(#[from] PasswordError),
    #[error(transparent)]
    TokenError(#[from] TokenError),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add("body", rejection.body_text());
        AppError::ValidationError(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(details) => {
                let body = Json(json!({
                    "error": "Invalid data",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid ID".to_string()),
            AppError::AuthError(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::SqlxError(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::PasswordError(e) => {
                tracing::error!("Password error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::TokenError(e) => {
                tracing::error!("Token error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
