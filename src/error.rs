//! Error taxonomy for worker execution.

use std::sync::Arc;

use thiserror::Error;

use crate::code::ErrorCode;
use crate::worker::WorkerName;

/// Errors raised by workers and by the execution engine.
///
/// Expected business failures travel through
/// [`WorkerResult`](crate::WorkerResult); this enum is the vocabulary for
/// failures that abort a worker's attempt outright. The engine never
/// swallows these: they are classified into the task status and re-raised
/// to the caller.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants in
/// future versions without breaking downstream code. When matching on this
/// error, always include a wildcard pattern.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum WorkflowError {
    /// A business failure with an explicit code and retry classification.
    #[error("worker failed: {error_code}")]
    Worker {
        /// The failure's error code.
        error_code: ErrorCode,
        /// Whether another attempt may succeed.
        can_retry: bool,
    },

    /// Upstream data was invalid. Never retried, since the same input would
    /// fail again.
    #[error("invalid input argument: {error_code}")]
    InputArgument {
        /// The failure's error code.
        error_code: ErrorCode,
    },

    /// A required input type was never produced by an earlier step.
    ///
    /// Always a hard stop: this indicates a defect in the task's wiring, not
    /// a transient condition.
    #[error("input {type_name} not found for worker {worker_name}; an earlier step must produce it")]
    InputNotFound {
        /// The worker whose input was missing.
        worker_name: WorkerName,
        /// The missing input type.
        type_name: &'static str,
    },

    /// A required context value was absent in an ensure accessor.
    #[error("context value not found: {type_name}")]
    ContextNotFound {
        /// The missing value type.
        type_name: &'static str,
    },

    /// The engine surface was used incorrectly.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Anything else raised by worker logic.
    ///
    /// Retryable by default; mapped to code `-1` with the error's rendering
    /// when recorded into the task status.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowError {
    /// A domain worker failure.
    pub fn worker(error_code: ErrorCode, can_retry: bool) -> Self {
        Self::Worker {
            error_code,
            can_retry,
        }
    }

    /// An invalid-input failure; never retried.
    pub fn input_argument(error_code: ErrorCode) -> Self {
        Self::InputArgument { error_code }
    }

    /// Wraps an arbitrary error raised by worker logic.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Arc::new(error))
    }

    /// The default retry classification used by the engine's eligibility
    /// check: domain failures honor their explicit flag, invalid input and
    /// missing input never retry, anything else defaults to retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Worker { can_retry, .. } => *can_retry,
            WorkflowError::InputArgument { .. } => false,
            WorkflowError::InputNotFound { .. } => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = WorkflowError::worker(ErrorCode::new(9101, "backend down"), true);
        assert_eq!(error.to_string(), "worker failed: 9101 backend down");

        let error = WorkflowError::ContextNotFound { type_name: "Foo" };
        assert_eq!(error.to_string(), "context value not found: Foo");
    }

    #[test]
    fn test_retry_classification() {
        assert!(WorkflowError::worker(ErrorCode::new(9102, "x"), true).is_retryable());
        assert!(!WorkflowError::worker(ErrorCode::new(9102, "x"), false).is_retryable());
        assert!(!WorkflowError::input_argument(ErrorCode::new(9103, "bad")).is_retryable());
        assert!(!WorkflowError::InputNotFound {
            worker_name: WorkerName::new("W"),
            type_name: "Foo",
        }
        .is_retryable());
        assert!(WorkflowError::other(std::io::Error::other("io")).is_retryable());
    }

    #[test]
    fn test_other_preserves_message() {
        let error = WorkflowError::other(std::io::Error::other("disk on fire"));
        assert_eq!(error.to_string(), "disk on fire");
    }
}
