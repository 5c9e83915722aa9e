//! Error types used by the agent core and its collaborators.
//!
//! This module defines three error enums:
//!
//! - [`CallError`]: failures returned to the caller of a [`Call`](crate::Call).
//! - [`BackendError`]: failures reported by external collaborators (execution backend,
//!   file browser, verbosity sink). They never reach the caller verbatim.
//! - [`RuntimeError`]: failures of the agent runtime itself (shutdown).
//!
//! All types provide `as_label` / `as_message` helpers for logs and events.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by call handlers.
///
/// The variants map one-to-one onto the response-level failure classes of the
/// agent protocol. `Internal` is intentionally opaque: backend detail is logged
/// where the failure happens and replaced by a short context string.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Unknown container id, path, task, etc.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up (e.g. `container 'abc'`).
        what: String,
    },

    /// Duplicate container id. Ids are never recycled.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// The duplicated identity.
        what: String,
    },

    /// Malformed or missing field, unknown call type, out-of-range value.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which rule was violated.
        reason: String,
    },

    /// A bounded operation ran out of time before producing any result.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Unexpected collaborator failure.
    #[error("internal error: {context}")]
    Internal {
        /// Operation that failed; never contains backend detail.
        context: String,
    },
}

impl CallError {
    /// Shorthand for [`CallError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        CallError::NotFound { what: what.into() }
    }

    /// Shorthand for [`CallError::AlreadyExists`].
    pub fn already_exists(what: impl Into<String>) -> Self {
        CallError::AlreadyExists { what: what.into() }
    }

    /// Shorthand for [`CallError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        CallError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CallError::Internal`].
    pub fn internal(context: impl Into<String>) -> Self {
        CallError::Internal {
            context: context.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::CallError;
    ///
    /// let err = CallError::not_found("container 'c1'");
    /// assert_eq!(err.as_label(), "not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::NotFound { .. } => "not_found",
            CallError::AlreadyExists { .. } => "already_exists",
            CallError::InvalidArgument { .. } => "invalid_argument",
            CallError::Timeout { .. } => "timeout",
            CallError::Internal { .. } => "internal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CallError::NotFound { what } => format!("not found: {what}"),
            CallError::AlreadyExists { what } => format!("already exists: {what}"),
            CallError::InvalidArgument { reason } => format!("invalid: {reason}"),
            CallError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            CallError::Internal { context } => format!("internal: {context}"),
        }
    }
}

/// # Errors reported by external collaborators.
///
/// The execution backend, file browser and verbosity sink return this type.
/// The agent converts it into [`CallError`] at the handler boundary.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The collaborator does not know the requested object.
    #[error("unknown: {what}")]
    Unknown {
        /// Object identity.
        what: String,
    },

    /// The collaborator failed while handling the request.
    #[error("backend failure: {error}")]
    Failed {
        /// Underlying error message.
        error: String,
    },
}

impl BackendError {
    /// Shorthand for [`BackendError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        BackendError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Unknown { .. } => "backend_unknown",
            BackendError::Failed { .. } => "backend_failed",
        }
    }

    /// Converts into a caller-facing error.
    ///
    /// `Unknown` becomes `NotFound`; anything else becomes an opaque `Internal`
    /// carrying only `context`.
    pub fn into_call_error(self, context: &str) -> CallError {
        match self {
            BackendError::Unknown { what } => CallError::NotFound { what },
            BackendError::Failed { .. } => CallError::internal(context),
        }
    }
}

/// # Errors produced by the agent runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some containers had not terminated.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Container ids that were still not terminated.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck containers={stuck:?}")
            }
        }
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_opaque() {
        let err = BackendError::failed("fork: resource temporarily unavailable")
            .into_call_error("launch container 'c1'");
        assert_eq!(err, CallError::internal("launch container 'c1'"));
        assert!(!err.to_string().contains("fork"));
    }

    #[test]
    fn unknown_maps_to_not_found() {
        let err = BackendError::Unknown {
            what: "/var/log".into(),
        }
        .into_call_error("list files");
        assert_eq!(err.as_label(), "not_found");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(CallError::already_exists("x").as_label(), "already_exists");
        assert_eq!(CallError::invalid("x").as_label(), "invalid_argument");
        assert_eq!(
            CallError::Timeout {
                timeout: Duration::from_millis(1)
            }
            .as_label(),
            "timeout"
        );
        assert_eq!(CallError::internal("x").as_label(), "internal");
    }
}
