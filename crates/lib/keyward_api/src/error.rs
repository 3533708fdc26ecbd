//! Application error types.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keyward_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not validate credentials.")]
    InvalidCredentials,

    #[error("Token not found.")]
    TokenMissing,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token has expired.")]
    TokenExpired,

    #[error("User not found.")]
    UserNotFound,

    #[error("User is inactive.")]
    UserInactive,

    #[error("Username already exists.")]
    UsernameAlreadyExists,

    #[error("Email already exists.")]
    EmailAlreadyExists,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::TokenMissing => (StatusCode::UNAUTHORIZED, "token_missing"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::UserInactive => (StatusCode::FORBIDDEN, "user_inactive"),
            AppError::UsernameAlreadyExists => (StatusCode::CONFLICT, "username_exists"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_exists"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Validation(m) => m.clone(),
            AppError::Internal(detail) => {
                error!(detail = %detail, "request failed");
                self.to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::TokenMissing => AppError::TokenMissing,
            AuthError::InvalidToken(_) => AppError::InvalidToken,
            AuthError::TokenExpired => AppError::TokenExpired,
            AuthError::UserNotFound => AppError::UserNotFound,
            AuthError::UserInactive => AppError::UserInactive,
            AuthError::UsernameAlreadyExists => AppError::UsernameAlreadyExists,
            AuthError::EmailAlreadyExists => AppError::EmailAlreadyExists,
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Config(msg) => AppError::Internal(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
