//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Authentication and authorization failures.
///
/// The `Display` text is for server-side logs only. Callers see the
/// generic message produced by [`AuthError::public_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header is not `Bearer <token>`")]
    MalformedHeader,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("old password does not match")]
    IncorrectOldPassword,

    #[error("token expired")]
    TokenExpired,

    #[error("token invalid: {0}")]
    TokenInvalid(String),

    #[error("wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },

    #[error("no identity attached to request")]
    MissingIdentity,

    #[error("role not permitted for this route")]
    InsufficientRole,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::InvalidCredentials
            | AuthError::IncorrectOldPassword
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::WrongTokenType { .. } => StatusCode::UNAUTHORIZED,
            AuthError::MissingIdentity | AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader | AuthError::MalformedHeader => "UNAUTHORIZED",
            AuthError::InvalidCredentials | AuthError::IncorrectOldPassword => {
                "INVALID_CREDENTIALS"
            }
            AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::WrongTokenType { .. } => "INVALID_TOKEN",
            AuthError::MissingIdentity | AuthError::InsufficientRole => "FORBIDDEN",
            AuthError::Signing(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the caller. Expired and invalid tokens
    /// read the same so the caller only learns "re-authenticate".
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "Authorization header missing",
            AuthError::MalformedHeader => "Invalid Authorization header format",
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::IncorrectOldPassword => "Old password is incorrect",
            AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::WrongTokenType { .. } => "Invalid or expired token",
            AuthError::MissingIdentity => "No claims found",
            AuthError::InsufficientRole => "Insufficient privileges",
            AuthError::Signing(_) => "An internal error occurred",
        }
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AppError::Auth(e) => {
                if let AuthError::Signing(_) = e {
                    error!("Auth error: {}", e);
                } else {
                    debug!("Auth rejected: {}", e);
                }
                (e.status(), e.code(), e.public_message().to_string())
            }
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "POOL_EXHAUSTED",
                    "Database connection pool exhausted".to_string(),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
            ),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::Auth(self).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;
