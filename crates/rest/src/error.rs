//! Caller-facing errors.
//!
//! Every account operation reports one of four statuses. Storage errors are
//! never shown to callers: the cause is logged and an opaque
//! [`ApiError::Internal`] is returned instead.
//!
//! | Variant | HTTP Status | Code |
//! |---------|-------------|------|
//! | InvalidArgument | 400 | `invalid_argument` |
//! | Unauthenticated | 401 | `unauthenticated` |
//! | NotFound | 404 | `not_found` |
//! | Internal | 500 | `internal` |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stratum_persistence::error::{StorageError, ValidationError};
use tracing::error;

/// Message returned for every opaque internal failure.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Status returned to callers of the account operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller input violates a business rule.
    InvalidArgument {
        /// User-safe message.
        message: String,
    },

    /// The supplied credentials did not match.
    Unauthenticated {
        /// User-safe message.
        message: String,
    },

    /// The addressed row does not exist.
    NotFound {
        /// User-safe message.
        message: String,
    },

    /// Infrastructure or store failure.
    Internal {
        /// User-safe message.
        message: String,
    },
}

impl ApiError {
    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an `Unauthenticated` error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// Logs `err` and returns an `Internal` error carrying `message`.
    pub fn internal_from(err: &StorageError, message: impl Into<String>) -> Self {
        error!(error = %err, "storage failure");
        Self::internal(message)
    }

    /// Returns the machine-readable status code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument { .. } => "invalid_argument",
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Internal { .. } => "internal",
        }
    }

    /// Returns the user-safe message.
    pub fn message(&self) -> &str {
        match self {
            ApiError::InvalidArgument { message }
            | ApiError::Unauthenticated { message }
            | ApiError::NotFound { message }
            | ApiError::Internal { message } => message,
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal_from(&err, INTERNAL_MESSAGE)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid_argument(err.to_string())
    }
}

/// Result type for account operations.
pub type ApiResult<T> = Result<T, ApiError>;
