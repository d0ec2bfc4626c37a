//! Observer hooks around worker execution.

use crate::error::WorkflowError;
use crate::result::WorkerResult;
use crate::worker::Worker;

/// Observer notified around every worker attempt.
///
/// Implemented externally (telemetry, metrics, test instrumentation) and
/// consumed by the engine. Hooks fire per attempt, so one logical execution
/// that retries twice reports two start/finish pairs. All methods default to
/// no-ops.
pub trait RunMonitor: Send + Sync {
    /// Called before an attempt begins.
    fn on_start(&self, _worker: &dyn Worker) {}

    /// Called after an attempt produces a result, success or failure.
    fn on_finish(&self, _worker: &dyn Worker, _result: &WorkerResult) {}

    /// Called after an attempt raises an error. Observation only: the error
    /// still propagates through the engine's retry logic.
    fn on_exception(&self, _worker: &dyn Worker, _error: &WorkflowError) {}
}
