//! Unified application error types for DirHub.
//!
//! Every crate maps its internal failures into [`AppError`] so that the
//! `?` operator works across crate boundaries. The [`ErrorKind`] is the
//! enumerated taxonomy that transports map onto their own status codes.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A write was attempted against a read-only store.
    ReadOnly,
    /// `create_root` was called with a parent.
    RootWithParent,
    /// `create_directory` was called without a parent.
    WithoutParent,
    /// The directory (or a required ancestor) does not exist or is deleted.
    NotFound,
    /// The caller's store handle does not grant root-level operations.
    NoRootAccess,
    /// A controller was built without a reconciler.
    NoReconciler,
    /// The mutation committed but publishing its event failed.
    NotifyFailed,
    /// A directory identifier could not be parsed.
    ParseId,
    /// Input validation failed.
    Validation,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// A database error occurred.
    Database,
    /// The message bus failed or closed.
    Bus,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "READ_ONLY"),
            Self::RootWithParent => write!(f, "ROOT_WITH_PARENT"),
            Self::WithoutParent => write!(f, "WITHOUT_PARENT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::NoRootAccess => write!(f, "NO_ROOT_ACCESS"),
            Self::NoReconciler => write!(f, "NO_RECONCILER"),
            Self::NotifyFailed => write!(f, "NOTIFY_FAILED"),
            Self::ParseId => write!(f, "PARSE_ID"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Database => write!(f, "DATABASE"),
            Self::Bus => write!(f, "BUS"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout DirHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Create a read-only error.
    pub fn read_only() -> Self {
        Self::new(ErrorKind::ReadOnly, "store is read-only")
    }

    /// Create a root-with-parent error.
    pub fn root_with_parent() -> Self {
        Self::new(ErrorKind::RootWithParent, "a root directory cannot have a parent")
    }

    /// Create a without-parent error.
    pub fn without_parent() -> Self {
        Self::new(ErrorKind::WithoutParent, "a directory requires a parent")
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a no-root-access error.
    pub fn no_root_access() -> Self {
        Self::new(ErrorKind::NoRootAccess, "root operations are not permitted")
    }

    /// Create a no-reconciler error.
    pub fn no_reconciler() -> Self {
        Self::new(ErrorKind::NoReconciler, "a controller requires a reconciler")
    }

    /// Wrap a publication failure. The mutation that preceded it has committed.
    pub fn notify_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        let message = format!("event publication failed: {source}");
        Self::with_source(ErrorKind::NotifyFailed, message, source)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a message bus error.
    pub fn bus(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Bus, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        Self::with_source(ErrorKind::ParseId, format!("invalid directory id: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
