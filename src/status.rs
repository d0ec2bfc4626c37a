//! Task-wide first-failure-wins status.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::code::ErrorCode;
use crate::error::WorkflowError;
use crate::worker::WorkerName;

/// The task-wide record of whether, and why, the task has failed.
///
/// Created once per task, mutated only by the engine, read by workers and by
/// the engine's retry logic. Once failed, no later failure may overwrite the
/// recorded code or worker: only the very first failure sticks for the
/// remainder of the task. [`RunStatus::try_set_error`] is the single write
/// path enforcing that rule.
#[derive(Debug)]
pub struct RunStatus {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    status: ErrorCode,
    failed_worker: Option<WorkerName>,
    last_error: Option<WorkflowError>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: ErrorCode::ok(),
                failed_worker: None,
                last_error: None,
            }),
        }
    }
}

impl RunStatus {
    /// Creates a non-failed status.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` once any failure has been recorded.
    pub fn is_fail(&self) -> bool {
        !self.lock().status.is_ok()
    }

    /// The current status code (`Ok` while the task has not failed).
    pub fn code(&self) -> ErrorCode {
        self.lock().status.clone()
    }

    /// The worker whose failure fixed the status, if any.
    pub fn failed_worker(&self) -> Option<WorkerName> {
        self.lock().failed_worker.clone()
    }

    /// The most recent error propagated out of a worker, if any.
    ///
    /// Unlike the status code, this is updated on every propagated error,
    /// not just the first.
    pub fn last_error(&self) -> Option<WorkflowError> {
        self.lock().last_error.clone()
    }

    pub(crate) fn set_last_error(&self, error: WorkflowError) {
        self.lock().last_error = Some(error);
    }

    /// Records the first failure and the worker that produced it.
    ///
    /// Returns `false` without touching anything when the task has already
    /// failed.
    pub fn try_set_error(&self, error_code: ErrorCode, failed_worker: WorkerName) -> bool {
        debug_assert!(!error_code.is_ok(), "cannot fail a task with the Ok code");

        let mut inner = self.lock();
        if !inner.status.is_ok() {
            return false;
        }

        inner.status = error_code;
        inner.failed_worker = Some(failed_worker);
        true
    }

    /// A serializable snapshot for reporting.
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        StatusSnapshot {
            code: inner.status.code(),
            message: inner.status.message().to_string(),
            failed_worker: inner.failed_worker.clone(),
        }
    }
}

/// A point-in-time view of a [`RunStatus`], suitable for structured
/// reporting.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// The recorded status code (`0` while not failed).
    pub code: i32,
    /// The recorded status message.
    pub message: String,
    /// The worker whose failure fixed the status.
    pub failed_worker: Option<WorkerName>,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        if inner.status.is_ok() {
            write!(f, "Ok")
        } else {
            write!(f, "[{}] {}", inner.status.code(), inner.status.message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_non_failed() {
        let status = RunStatus::new();
        assert!(!status.is_fail());
        assert!(status.code().is_ok());
        assert_eq!(status.failed_worker(), None);
    }

    #[test]
    fn test_first_failure_wins() {
        let status = RunStatus::new();

        assert!(status.try_set_error(ErrorCode::new(9301, "first"), WorkerName::new("A")));
        assert!(status.is_fail());

        // A second failure must not overwrite the first.
        assert!(!status.try_set_error(ErrorCode::new(9302, "second"), WorkerName::new("B")));
        assert_eq!(status.code().code(), 9301);
        assert_eq!(status.failed_worker(), Some(WorkerName::new("A")));

        // Idempotent under repeated calls with the same code too.
        assert!(!status.try_set_error(ErrorCode::new(9301, "again"), WorkerName::new("C")));
        assert_eq!(status.failed_worker(), Some(WorkerName::new("A")));
    }

    #[test]
    fn test_display() {
        let status = RunStatus::new();
        assert_eq!(status.to_string(), "Ok");

        let _ = status.try_set_error(ErrorCode::new(9303, "broke"), WorkerName::new("A"));
        assert_eq!(status.to_string(), "[9303] broke");
    }

    #[test]
    fn test_snapshot() {
        let status = RunStatus::new();
        let _ = status.try_set_error(ErrorCode::new(9304, "broke"), WorkerName::new("A"));

        let snapshot = status.snapshot();
        assert_eq!(snapshot.code, 9304);
        assert_eq!(snapshot.message, "broke");
        assert_eq!(snapshot.failed_worker, Some(WorkerName::new("A")));
    }
}
