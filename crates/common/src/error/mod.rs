//! Shared error vocabulary
//!
//! [`CommonError`] covers the failures that are not domain concepts: elapsed
//! deadlines, unreachable backends, broken invariants. Domain failures
//! (`Auth`, `Scrape`, `Action`, ...) live in `washslot-domain`; a
//! `CommonError` raised around a domain call is folded into the domain kind of
//! that call.
//!
//! [`ErrorClassification`] is the one question every crate answers about its
//! errors before logging them: is a later attempt worth it, and how loud
//! should this be.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use washslot_common::error::{CommonError, ErrorClassification, ErrorSeverity};
//!
//! let err = CommonError::timeout("portal.fetch_slots", Duration::from_secs(30));
//! assert!(err.is_retryable());
//! assert_eq!(err.severity(), ErrorSeverity::Warning);
//! assert_eq!(err.to_string(), "Operation 'portal.fetch_slots' timed out after 30s");
//! ```

use std::fmt;
use std::time::Duration;

/// Result alias for [`CommonError`].
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// A deadline around a remote call elapsed.
    Timeout { operation: String, duration: Duration },

    /// A collaborator answered with a failure.
    Backend { service: String, message: String, is_retryable: bool },

    /// A task was stopped before it finished.
    TaskCancelled { task_id: String },

    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { operation, duration } => {
                write!(f, "Operation '{operation}' timed out after {duration:?}")
            }
            Self::Backend { service, message, .. } => {
                write!(f, "Backend error from '{service}': {message}")
            }
            Self::TaskCancelled { task_id } => write!(f, "Task '{task_id}' cancelled"),
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    pub fn backend<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        is_retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable }
    }

    pub fn task_cancelled<S: Into<String>>(task_id: S) -> Self {
        Self::TaskCancelled { task_id: task_id.into() }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Backend { is_retryable, .. } => *is_retryable,
            Self::TaskCancelled { .. } | Self::Internal { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Backend { .. } => ErrorSeverity::Error,
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Retryability and severity of an error.
pub trait ErrorClassification {
    /// Whether the same call may succeed later without any change on our side.
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
