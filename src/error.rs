//! Error types for the extension host

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error classes surfaced on the wire as `Response.error.kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No router registered for the domain, or the router did not recognize
    /// the operation
    NoHandler,
    /// Payload failed domain-specific validation
    InvalidArgument,
    /// Operation not permitted for this extension or session
    PermissionDenied,
    /// Referenced resource does not exist
    NotFound,
    /// Fault during routing, or a deferred future that failed to produce a
    /// usable result
    Internal,
    /// Request tagged with a session identifier that is not the active one.
    /// Never answered on the wire; kept in the taxonomy for logging.
    SessionMismatch,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoHandler => "noHandler",
            Self::InvalidArgument => "invalidArgument",
            Self::PermissionDenied => "permissionDenied",
            Self::NotFound => "notFound",
            Self::Internal => "internal",
            Self::SessionMismatch => "sessionMismatch",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the extension host runtime
#[derive(Debug, Error)]
pub enum HostError {
    /// Frame-level wire failure
    #[error("Frame error: {0}")]
    Frame(String),

    /// The manager process connection is gone
    #[error("Extension manager is not connected")]
    NotConnected,

    /// The manager rejected or failed a load/unload request
    #[error("Manager request failed: {0}")]
    Manager(String),

    /// Manager request timed out
    #[error("Manager request timed out after {0}s")]
    Timeout(u64),

    /// Session lifecycle misuse (e.g. load called twice)
    #[error("Invalid session state: {0}")]
    SessionState(String),

    /// Could not spawn the extension manager process
    #[error("Failed to spawn extension manager: {0}")]
    Spawn(String),
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Structured error produced by a capability router.
///
/// Routers never panic across the dispatch boundary: every failure is folded
/// into one of these and answered as an error response for that request only.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err.to_string())
    }
}
