//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the persistence layer,
//! following a hierarchy that separates row-level errors, tenant errors,
//! validation errors, transaction errors and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Row state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Tenant resolution errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns `true` if this error is a uniqueness-constraint violation.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::AlreadyExists { .. }))
    }

    /// Returns `true` if this error reports a missing row or tenant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Resource(ResourceError::NotFound { .. })
                | StorageError::Tenant(TenantError::NotFound { .. })
        )
    }

    /// Returns `true` if the call's cancellation signal or deadline fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            StorageError::Transaction(TransactionError::Cancelled)
                | StorageError::Transaction(TransactionError::Timeout { .. })
        )
    }
}

/// Which of the two stores an error or transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// The shared control store.
    Control,
    /// A per-tenant store.
    Tenant,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Control => write!(f, "control"),
            StoreKind::Tenant => write!(f, "tenant"),
        }
    }
}

/// Errors related to row state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested row was not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A row with the same unique key already exists.
    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },
}

/// Errors related to tenant resolution.
#[derive(Error, Debug)]
pub enum TenantError {
    /// No tenant with this identifier exists in the control store.
    #[error("tenant not found: {tenant_id}")]
    NotFound { tenant_id: String },

    /// The tenant identifier could not be parsed.
    #[error("invalid tenant id: {value}")]
    InvalidTenantId { value: String },

    /// A tenant-store operation was requested on a context with no tenant.
    #[error("no tenant bound to this context")]
    NoTenantBound,
}

/// Errors related to input validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A field could not be parsed or violates its format.
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The call was cancelled before or during the operation.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// The call deadline elapsed.
    #[error("operation deadline exceeded after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transaction is no longer valid (already committed or rolled back).
    #[error("transaction no longer valid")]
    InvalidTransaction,

    /// A transaction could not be started.
    #[error("failed to begin {store} transaction: {reason}")]
    BeginFailed { store: StoreKind, reason: String },

    /// A transaction could not be committed.
    #[error("failed to commit {store} transaction: {reason}")]
    CommitFailed { store: StoreKind, reason: String },

    /// A transaction could not be rolled back.
    #[error("failed to roll back {store} transaction: {reason}")]
    RollbackFailed { store: StoreKind, reason: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.into())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::OperationInterrupted {
                return StorageError::Transaction(TransactionError::Cancelled);
            }
        }
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
