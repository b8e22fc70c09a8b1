//! Error types module
//!
//! All failures surfaced by Stowage are unified under [`AttachmentError`]. Blob store
//! failures carry a [`BackendErrorKind`] so callers can tell a missing blob from an
//! expired credential from a network problem, and every transfer failure is wrapped
//! with the [`TransferContext`] it happened in.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the caller
pub trait ErrorMetadata {
    /// HTTP status code a request handler should answer with
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "BLOB_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same operation
    fn is_recoverable(&self) -> bool;

    /// Human-actionable hint for operators
    fn suggested_action(&self) -> Option<&'static str>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Classification of a blob store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// The blob does not exist at the backend
    NotFound,
    /// The credential was rejected (expired or revoked SAS token, wrong account)
    AuthenticationFailure,
    /// Anything else: network, throttling, unexpected responses
    Connectivity,
}

impl Display for BackendErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendErrorKind::NotFound => write!(f, "blob not found"),
            BackendErrorKind::AuthenticationFailure => write!(f, "authentication failed"),
            BackendErrorKind::Connectivity => write!(f, "blob store unavailable"),
        }
    }
}

/// A classified failure reported by a blob store client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::AuthenticationFailure, message)
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Connectivity, message)
    }
}

/// Blob transfer operation an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Download,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Download => write!(f, "download"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Diagnostic fields attached to a failed transfer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferContext {
    pub filename: Option<String>,
    pub attachment_id: Option<Uuid>,
    pub container: Option<String>,
    pub blob_key: Option<String>,
    pub elapsed_ms: f64,
}

impl Display for TransferContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut parts = Vec::new();
        if let Some(filename) = &self.filename {
            parts.push(format!("filename={}", filename));
        }
        if let Some(id) = &self.attachment_id {
            parts.push(format!("id={}", id));
        }
        if let Some(container) = &self.container {
            parts.push(format!("container={}", container));
        }
        if let Some(key) = &self.blob_key {
            parts.push(format!("blob={}", key));
        }
        parts.push(format!("elapsed_ms={:.1}", self.elapsed_ms));
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Blob store error: {0}")]
    Backend(#[from] BackendError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Attachment {operation} failed ({context}): {source}")]
    Transfer {
        operation: Operation,
        context: TransferContext,
        #[source]
        source: Box<AttachmentError>,
    },
}

/// Result type for attachment operations
pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Flat category of an [`AttachmentError`], looking through transfer context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    NotFound,
    AuthenticationFailure,
    Connectivity,
    Metadata,
    Io,
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AttachmentError {
    fn from(err: SqlxError) -> Self {
        AttachmentError::Database(err)
    }
}

impl From<serde_json::Error> for AttachmentError {
    fn from(err: serde_json::Error) -> Self {
        AttachmentError::Configuration(format!("JSON parsing error: {}", err))
    }
}

impl AttachmentError {
    /// Wrap this error with the operation and diagnostics it failed with.
    pub fn in_transfer(self, operation: Operation, context: TransferContext) -> Self {
        AttachmentError::Transfer {
            operation,
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping transfer wrappers
    pub fn root(&self) -> &AttachmentError {
        match self {
            AttachmentError::Transfer { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AttachmentError::Configuration(_) => ErrorKind::Configuration,
            AttachmentError::Validation(_) => ErrorKind::Validation,
            AttachmentError::Backend(err) => match err.kind {
                BackendErrorKind::NotFound => ErrorKind::NotFound,
                BackendErrorKind::AuthenticationFailure => ErrorKind::AuthenticationFailure,
                BackendErrorKind::Connectivity => ErrorKind::Connectivity,
            },
            AttachmentError::Metadata(_) => ErrorKind::Metadata,
            #[cfg(feature = "sqlx")]
            AttachmentError::Database(_) => ErrorKind::Metadata,
            AttachmentError::Io(_) => ErrorKind::Io,
            AttachmentError::Transfer { source, .. } => source.kind(),
        }
    }

    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self.root() {
            AttachmentError::Backend(err) => Some(err.kind),
            _ => None,
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        self.backend_kind() == Some(BackendErrorKind::AuthenticationFailure)
    }

    /// Operation of the outermost transfer wrapper, if any
    pub fn operation(&self) -> Option<Operation> {
        match self {
            AttachmentError::Transfer { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&TransferContext> {
        match self {
            AttachmentError::Transfer { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Static metadata for each category: (http_status, error_code, recoverable, suggested_action, log_level).
fn kind_static_metadata(
    kind: ErrorKind,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match kind {
        ErrorKind::Configuration => (
            500,
            "STORAGE_CONFIGURATION_ERROR",
            false,
            Some("Check the blob store binding: container name, container URI and SAS token"),
            LogLevel::Error,
        ),
        ErrorKind::Validation => (
            400,
            "INVALID_ATTACHMENT",
            false,
            Some("Ensure attachment data includes a blob key and file content"),
            LogLevel::Debug,
        ),
        ErrorKind::NotFound => (
            404,
            "BLOB_NOT_FOUND",
            false,
            Some("File may have been deleted from the blob store or its key is incorrect"),
            LogLevel::Warn,
        ),
        ErrorKind::AuthenticationFailure => (
            502,
            "BLOB_AUTHENTICATION_FAILED",
            true,
            Some("Check blob store credentials and SAS token expiry"),
            LogLevel::Error,
        ),
        ErrorKind::Connectivity => (
            503,
            "BLOB_STORE_UNAVAILABLE",
            true,
            Some("Check blob store connectivity, container permissions and configuration"),
            LogLevel::Error,
        ),
        ErrorKind::Metadata => (
            500,
            "METADATA_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        ErrorKind::Io => (
            400,
            "CONTENT_READ_ERROR",
            false,
            Some("Check that the upload stream is readable to the end"),
            LogLevel::Warn,
        ),
    }
}

impl ErrorMetadata for AttachmentError {
    fn http_status_code(&self) -> u16 {
        kind_static_metadata(self.kind()).0
    }

    fn error_code(&self) -> &'static str {
        kind_static_metadata(self.kind()).1
    }

    fn is_recoverable(&self) -> bool {
        kind_static_metadata(self.kind()).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        kind_static_metadata(self.kind()).3
    }

    fn log_level(&self) -> LogLevel {
        kind_static_metadata(self.kind()).4
    }
}
