//! Error types for the managed group service

use std::collections::BTreeMap;
use thiserror::Error;

use crate::repository::StoreError;

/// Message used for every request-shape rejection
pub const INVALID_REQUEST_MESSAGE: &str = "Error in provided request.";

/// Message used when nothing more specific may be revealed
pub const NOT_FOUND_MESSAGE: &str = "Resource not found.";

/// Managed group service errors
///
/// Variants map one-to-one onto the failure kinds exposed to callers.
#[derive(Debug, Error)]
pub enum ManagedGroupError {
    /// Malformed request, keyed by offending field
    #[error("{message}")]
    InvalidArgument {
        /// Summary message
        message: String,
        /// Field name to problem description
        fields: BTreeMap<String, String>,
    },

    /// Unknown subtype, absent entity or parent, or version mismatch
    #[error("{0}")]
    NotFound(String),

    /// Denied by the policy engine
    #[error("{0}")]
    PermissionDenied(String),

    /// The enclosing request was cancelled before completion
    #[error("Request canceled.")]
    Canceled,

    /// Collaborator fault or violated invariant
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure kind, independent of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Canceled,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl ManagedGroupError {
    /// Build an invalid argument error from a field map
    pub fn invalid_argument(
        message: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            fields,
        }
    }

    /// Invalid argument with a single offending field
    pub fn invalid_field(
        message: impl Into<String>,
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), problem.into());
        Self::invalid_argument(message, fields)
    }

    /// Not found with a specific message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Not found without detail
    pub fn not_found_default() -> Self {
        Self::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Failure kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagedGroupError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ManagedGroupError::NotFound(_) => ErrorKind::NotFound,
            ManagedGroupError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ManagedGroupError::Canceled => ErrorKind::Canceled,
            ManagedGroupError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field details for invalid argument errors
    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ManagedGroupError::InvalidArgument { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Whether this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagedGroupError::NotFound(_))
    }
}

impl From<StoreError> for ManagedGroupError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ManagedGroupError::NotFound(err.to_string()),
            // Requests reach storage already validated
            StoreError::InvalidParameter(msg) => ManagedGroupError::Internal(msg),
            StoreError::Canceled => ManagedGroupError::Canceled,
            StoreError::Backend(msg) => ManagedGroupError::Internal(msg),
        }
    }
}

/// Result type for managed group operations
pub type Result<T> = std::result::Result<T, ManagedGroupError>;
