//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return
//! `Result<T, AppError>` unless they map a failure to a redirect themselves.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::directory::DirectoryError;
use crate::services::email::MailerError;
use crate::services::reset::ResetError;

/// A single field-level validation failure.
///
/// Validation errors are aggregated and reported per field, and always
/// detected before any mutation is attempted.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: &'static str,
    /// User-visible message.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Application-level error type for the directory service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Password-reset operation failed.
    #[error("Reset error: {0}")]
    Reset(#[from] ResetError),

    /// Directory operation failed.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Email dispatch failed.
    #[error("Mailer error: {0}")]
    Mailer(#[from] MailerError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body for field-validation failures.
#[derive(Serialize)]
struct ValidationBody<'a> {
    message: &'static str,
    errors: &'a [FieldError],
}

impl AppError {
    /// Field errors carried by this error, if it is a validation failure.
    fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Auth(AuthError::Validation(errors))
            | Self::Directory(DirectoryError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Mailer(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Validation failures carry their per-field detail
        if let Some(errors) = self.field_errors() {
            let body = Json(ValidationBody {
                message: "validation failed",
                errors,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Mailer(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Reset(err) => match err {
                ResetError::UserNotFound | ResetError::TokenInvalidOrExpired => {
                    StatusCode::UNAUTHORIZED
                }
                ResetError::PasswordMismatch
                | ResetError::WeakPassword(_)
                | ResetError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                ResetError::Notification(_) => StatusCode::BAD_GATEWAY,
                ResetError::Repository(_) | ResetError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Directory(err) => match err {
                DirectoryError::NotFound => StatusCode::NOT_FOUND,
                DirectoryError::OwnershipViolation => StatusCode::FORBIDDEN,
                DirectoryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DirectoryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Mailer(_) => "Notification delivery failed".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Validation(_) => "Validation failed".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Reset(err) => match err {
                // Wrong token and expired token are deliberately
                // indistinguishable here.
                ResetError::TokenInvalidOrExpired => "Token is invalid or has expired".to_string(),
                ResetError::UserNotFound => "No account with that email exists".to_string(),
                ResetError::PasswordMismatch => "Passwords do not match".to_string(),
                ResetError::WeakPassword(msg) => msg.clone(),
                ResetError::InvalidEmail(_) => "Invalid email address".to_string(),
                ResetError::Notification(_) => "Could not send the reset email".to_string(),
                ResetError::Repository(_) | ResetError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Directory(err) => match err {
                DirectoryError::NotFound => "Store not found".to_string(),
                DirectoryError::OwnershipViolation => {
                    "You must own the store to edit it".to_string()
                }
                DirectoryError::Validation(_) => "Validation failed".to_string(),
                DirectoryError::Repository(_) => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store cafe-luna".to_string());
        assert_eq!(err.to_string(), "Not found: store cafe-luna");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_ownership_violation_is_forbidden() {
        assert_eq!(
            get_status(AppError::Directory(DirectoryError::OwnershipViolation)),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_token_errors_share_one_status() {
        // Wrong token and expired token must be indistinguishable.
        assert_eq!(
            get_status(AppError::Reset(ResetError::TokenInvalidOrExpired)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_validation_failure_is_unprocessable() {
        let errors = vec![FieldError::new("address", "You must supply an address")];
        assert_eq!(
            get_status(AppError::Directory(DirectoryError::Validation(errors))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
