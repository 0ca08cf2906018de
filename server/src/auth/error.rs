//! Authentication Error Types
//!
//! Central error taxonomy. Every variant renders as the JSON envelope
//! `{ success, message, httpStatusCode, error, service }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::password::PasswordError;
use super::session::SessionError;
use crate::db::{KvError, StoreError};

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing Authorization header.
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// Invalid authorization header format.
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Invalid token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but its session is gone.
    #[error("Session expired, kindly login")]
    SessionExpired,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    /// Request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// Record store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Session store error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Password hashing or policy error.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// JWT signing error.
    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Internal server error.
    #[error("Internal server error")]
    Internal(String),
}

impl From<KvError> for AuthError {
    fn from(err: KvError) -> Self {
        Self::Session(SessionError::Store(err))
    }
}

/// Error envelope for JSON responses.
///
/// A copy rides in the response extensions so the router can stamp the
/// configured service name onto it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub http_status_code: u16,
    /// Machine-readable error code.
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            http_status_code: status.as_u16(),
            error,
            service: None,
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: Option<&str>) -> Self {
        self.service = service.map(str::to_string);
        self
    }

    /// Render with the given status.
    #[must_use]
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (status, Json(self.clone())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl AuthError {
    /// HTTP status and machine-readable code.
    #[must_use]
    pub const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingAuthHeader
            | Self::InvalidAuthHeader
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::SessionExpired
            | Self::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) | Self::Store(StoreError::Conflict(_)) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) | Self::Password(PasswordError::Policy(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            Self::Store(StoreError::Unavailable(_))
            | Self::Session(SessionError::Store(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            Self::Store(StoreError::Database(_))
            | Self::Session(SessionError::Serialization(_))
            | Self::Password(_)
            | Self::Jwt(_)
            | Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn public_message(&self, status: StatusCode) -> String {
        match self {
            Self::Store(StoreError::Conflict(_)) => "Resource already exists".to_string(),
            _ if status.is_server_error() => match status {
                StatusCode::SERVICE_UNAVAILABLE => {
                    "Service temporarily unavailable, please retry".to_string()
                }
                _ => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "Request failed");
        }

        ErrorEnvelope::new(status, code, self.public_message(status)).into_response_with(status)
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
