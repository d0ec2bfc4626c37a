//! The execution engine: retry, failure propagation and cleanup.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::code::ErrorCode;
use crate::context::WorkerContext;
use crate::delegate::{FnWorker, MapWorker};
use crate::error::WorkflowError;
use crate::monitor::RunMonitor;
use crate::registry::WorkerRegistry;
use crate::result::{TypedResult, WorkerResult};
use crate::status::RunStatus;
use crate::worker::{TypedWorker, Worker, WorkerName};

type RetryEligibility = Box<dyn Fn(&WorkflowError, u32) -> bool + Send + Sync>;

/// The engine that runs a task's workers in sequence.
///
/// A manager owns one task's identity, retry policy, context store, status
/// and execution stack. Callers repeatedly invoke
/// [`run_worker`](WorkerManager::run_worker) (by instance, from the
/// registry, or via an inline function); each call may itself drive nested
/// `run_worker` calls through the manager reference passed to
/// [`Worker::execute`]. Once the task has failed, later workers without the
/// run-when-failed flag are skipped and return a failure mirroring the task
/// status.
///
/// Call [`dispose`](WorkerManager::dispose) at the end of every task, on
/// every exit path, so executed workers are cleaned up in reverse order.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use itonami::{WorkerManager, WorkerRegistry, WorkerResult};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = Arc::new(WorkerRegistry::new());
/// let manager = WorkerManager::builder("task-1", "Demo", registry).build();
///
/// let result = manager
///     .run_fn("StoreGreeting", |ctx| async move {
///         ctx.set("hello".to_string());
///         Ok(WorkerResult::success())
///     })
///     .await
///     .unwrap();
///
/// assert!(result.is_success());
/// assert_eq!(manager.context().get::<String>(), Some("hello".to_string()));
/// manager.dispose().await;
/// # }
/// ```
pub struct WorkerManager {
    task_id: String,
    task_name: String,
    retry_count: u32,
    context: Arc<WorkerContext>,
    status: RunStatus,
    registry: Arc<WorkerRegistry>,
    monitor: Option<Arc<dyn RunMonitor>>,
    worker_stack: Mutex<Vec<Arc<dyn Worker>>>,
    retry_override: Option<RetryEligibility>,
}

impl fmt::Debug for WorkerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerManager")
            .field("task_id", &self.task_id)
            .field("task_name", &self.task_name)
            .field("retry_count", &self.retry_count)
            .field("status", &self.status)
            .finish()
    }
}

impl WorkerManager {
    /// Creates a builder for a manager bound to one task.
    pub fn builder(
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        registry: Arc<WorkerRegistry>,
    ) -> WorkerManagerBuilder {
        WorkerManagerBuilder {
            task_id: task_id.into(),
            task_name: task_name.into(),
            registry,
            retry_count: 3,
            context: None,
            monitor: None,
            retry_override: None,
        }
    }

    /// The task id, used for tracing.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The task name (the task's type, e.g. "PdfParse").
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// The maximum number of attempts per worker.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// The task's context store.
    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// A shared handle to the context store.
    pub fn context_arc(&self) -> Arc<WorkerContext> {
        Arc::clone(&self.context)
    }

    /// The task's first-failure-wins status.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// The worker construction collaborator.
    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Stores a value into the context. Returns `&self` for chaining.
    pub fn set_context<T: Any + Send + Sync>(&self, value: T) -> &Self {
        self.context.set(value);
        self
    }

    /// Converts an existing context value into a new one.
    ///
    /// Skipped entirely once the task has failed, so conversion chains can
    /// be written without checking the status between steps.
    pub fn map_context<I, O>(&self, map: impl FnOnce(I) -> O) -> Result<(), WorkflowError>
    where
        I: Any + Clone + Send + Sync,
        O: Any + Send + Sync,
    {
        if self.status.is_fail() {
            return Ok(());
        }

        let input = self.context.get_ensure::<I>()?;
        self.context.set(map(input));
        Ok(())
    }

    /// Produces a fresh instance of `W` from the registry without running
    /// it, for workers that drive a sub-worker themselves.
    pub fn resolve_worker<W: Any>(&self) -> Result<W, WorkflowError> {
        self.registry.resolve::<W>().ok_or_else(|| {
            WorkflowError::InvalidOperation(format!(
                "worker {} is not registered",
                std::any::type_name::<W>()
            ))
        })
    }

    /// Resolves `W` from the registry and runs it.
    pub async fn run_registered<W>(&self) -> Result<WorkerResult, WorkflowError>
    where
        W: Worker + Any,
    {
        let worker = self.resolve_worker::<W>()?;
        self.run_worker(worker).await
    }

    /// Runs an inline async closure as a worker.
    ///
    /// The closure runs with the default skip behavior: once the task has
    /// failed it is skipped. For a closure that must still run on failed
    /// tasks, build the adapter yourself and opt it in:
    /// `manager.run_worker(FnWorker::new(name, task).run_when_fail())`.
    pub async fn run_fn<F, Fut>(
        &self,
        name: impl Into<WorkerName>,
        task: F,
    ) -> Result<WorkerResult, WorkflowError>
    where
        F: Fn(Arc<WorkerContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WorkerResult, WorkflowError>> + Send + 'static,
    {
        self.run_worker(FnWorker::new(name, task)).await
    }

    /// Runs a plain `Fn(I) -> O` conversion as a typed worker: the input is
    /// read from the context and the output written back on success.
    ///
    /// Skipped once the task has failed, like any other worker. Use
    /// `manager.run_worker(MapWorker::new(name, map).run_when_fail())` for a
    /// conversion that must still run on failed tasks.
    pub async fn run_map<I, O, F>(
        &self,
        name: impl Into<WorkerName>,
        map: F,
    ) -> Result<WorkerResult, WorkflowError>
    where
        I: Any + Clone + Send + Sync,
        O: Any + Clone + Send + Sync,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        self.run_worker(MapWorker::new(name, map)).await
    }

    /// Runs a typed worker as a sub-step with an explicit input.
    ///
    /// Sets the input into the context, delegates to
    /// [`run_worker`](WorkerManager::run_worker), then reads the output back
    /// out, or synthesizes a non-retryable failure mirroring the task
    /// status when the task failed during (or before) the sub-run.
    pub async fn run_typed<W>(
        &self,
        worker: W,
        input: W::Input,
    ) -> Result<TypedResult<W::Output>, WorkflowError>
    where
        W: TypedWorker + 'static,
    {
        self.context.set(input);
        self.run_worker(worker).await?;

        if self.status.is_fail() {
            return Ok(self.fail_typed_result());
        }

        let output = self.context.get_ensure::<W::Output>()?;
        Ok(TypedResult::from_value(output))
    }

    /// Like [`run_typed`](WorkerManager::run_typed), but converts an
    /// existing context value into the worker's input first.
    pub async fn run_typed_from<W, A>(
        &self,
        worker: W,
        convert: impl FnOnce(A) -> W::Input + Send,
    ) -> Result<TypedResult<W::Output>, WorkflowError>
    where
        W: TypedWorker + 'static,
        A: Any + Clone + Send + Sync,
    {
        let argument = self.context.get_ensure::<A>()?;
        self.run_typed(worker, convert(argument)).await
    }

    /// Runs one worker under the task's retry policy.
    ///
    /// The central entry point: pushes the worker onto the execution stack,
    /// skips it when the task has already failed (unless the worker opts
    /// in), retries retryable failures up to the configured attempt count,
    /// and records the first failure into the task status. Unrecoverable
    /// errors are classified for status reporting and re-raised, never
    /// swallowed.
    pub async fn run_worker<W: Worker + 'static>(
        &self,
        worker: W,
    ) -> Result<WorkerResult, WorkflowError> {
        self.run_worker_arc(Arc::new(worker)).await
    }

    /// [`run_worker`](WorkerManager::run_worker) for an already-shared
    /// worker.
    pub async fn run_worker_arc(
        &self,
        worker: Arc<dyn Worker>,
    ) -> Result<WorkerResult, WorkflowError> {
        self.lock_stack().push(Arc::clone(&worker));

        if self.status.is_fail() && !worker.can_run_when_fail() {
            debug!(
                "Task '{}' already failed, skipping worker '{}': {}",
                self.task_id,
                worker.name(),
                self.status
            );
            return Ok(self.fail_result());
        }

        match self.run_with_retry(worker.as_ref()).await {
            Ok(result) => {
                if result.is_fail() {
                    self.record_worker_error(worker.as_ref(), result.error_code().clone());
                }
                Ok(result)
            }
            Err(error) => {
                self.record_worker_error(worker.as_ref(), Self::classify(&error));
                self.status.set_last_error(error.clone());
                Err(error)
            }
        }
    }

    async fn run_with_retry(&self, worker: &dyn Worker) -> Result<WorkerResult, WorkflowError> {
        for attempt in 0..self.retry_count {
            let is_last = attempt + 1 == self.retry_count;

            if attempt > 0 {
                tokio::time::sleep(worker.retry_delay()).await;
            }

            match self.observed_execute(worker).await {
                Ok(result) => {
                    if !is_last && result.is_fail() && result.can_retry() && worker.can_retry() {
                        info!(
                            "Worker '{}' failed ({}), retrying ({}/{})",
                            worker.name(),
                            result.error_code(),
                            attempt + 1,
                            self.retry_count
                        );
                        continue;
                    }
                    return Ok(result);
                }
                // A missing input is a wiring defect; retrying cannot help.
                Err(error @ WorkflowError::InputNotFound { .. }) => return Err(error),
                Err(error) => {
                    if is_last || !worker.can_retry() || !self.retry_eligible(&error, attempt) {
                        return Err(error);
                    }
                    warn!(
                        "Worker '{}' raised ({}), retrying ({}/{})",
                        worker.name(),
                        error,
                        attempt + 1,
                        self.retry_count
                    );
                }
            }
        }

        // retry_count is clamped to at least 1 and the final attempt always
        // returns from inside the loop.
        unreachable!("the final attempt always returns")
    }

    async fn observed_execute(&self, worker: &dyn Worker) -> Result<WorkerResult, WorkflowError> {
        if let Some(monitor) = &self.monitor {
            monitor.on_start(worker);
        }

        match worker.execute(self).await {
            Ok(result) => {
                if let Some(monitor) = &self.monitor {
                    monitor.on_finish(worker, &result);
                }
                Ok(result)
            }
            Err(error) => {
                if let Some(monitor) = &self.monitor {
                    monitor.on_exception(worker, &error);
                }
                Err(error)
            }
        }
    }

    /// Whether the engine may retry after `error`. Domain failures honor
    /// their explicit flag, anything else defaults to retryable; a
    /// builder-supplied override replaces this policy wholesale.
    fn retry_eligible(&self, error: &WorkflowError, attempt: u32) -> bool {
        if let Some(check) = &self.retry_override {
            return check(error, attempt);
        }
        error.is_retryable()
    }

    fn classify(error: &WorkflowError) -> ErrorCode {
        match error {
            WorkflowError::Worker { error_code, .. }
            | WorkflowError::InputArgument { error_code } => error_code.clone(),
            other => ErrorCode::new(-1, other.to_string()),
        }
    }

    fn record_worker_error(&self, worker: &dyn Worker, error_code: ErrorCode) {
        if self.status.is_fail() {
            return;
        }

        let annotated = error_code.append_message(Some(&format!("FailWorker:{}", worker.name())));
        if self.status.try_set_error(annotated, worker.name()) {
            warn!(
                "Task '{}' failed in worker '{}': {}",
                self.task_id,
                worker.name(),
                self.status
            );
        }
    }

    fn fail_result(&self) -> WorkerResult {
        debug_assert!(
            self.status.is_fail(),
            "fail results exist only once the task has failed"
        );
        WorkerResult::fail(self.status.code(), false)
    }

    fn fail_typed_result<T>(&self) -> TypedResult<T> {
        debug_assert!(
            self.status.is_fail(),
            "fail results exist only once the task has failed"
        );
        TypedResult::fail(self.status.code(), false)
    }

    fn lock_stack(&self) -> MutexGuard<'_, Vec<Arc<dyn Worker>>> {
        self.worker_stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cleans up every executed worker in reverse execution order, then
    /// releases the construction scope.
    ///
    /// A cleanup failure for one worker is logged and discarded so the
    /// remaining workers still get their chance. Consuming the manager makes
    /// the task's end explicit; run this on every exit path.
    pub async fn dispose(self) {
        let mut stack = self
            .worker_stack
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        while let Some(worker) = stack.pop() {
            if let Err(error) = worker.on_dispose(&self.context).await {
                warn!(
                    "Cleanup for worker '{}' in task '{}' failed, continuing: {}",
                    worker.name(),
                    self.task_id,
                    error
                );
            }
        }

        drop(self.registry);
    }
}

impl fmt::Display for WorkerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.status.is_fail() {
            format!("[Fail] {}", self.status)
        } else {
            "[OK]".to_string()
        };

        let names = self
            .lock_stack()
            .iter()
            .map(|worker| worker.name().to_string())
            .collect::<Vec<_>>()
            .join("-");

        write!(f, "[{}] {} WorkerList:{}", self.task_name, status, names)
    }
}

/// Builder for [`WorkerManager`] instances.
pub struct WorkerManagerBuilder {
    task_id: String,
    task_name: String,
    registry: Arc<WorkerRegistry>,
    retry_count: u32,
    context: Option<Arc<WorkerContext>>,
    monitor: Option<Arc<dyn RunMonitor>>,
    retry_override: Option<RetryEligibility>,
}

impl WorkerManagerBuilder {
    /// Sets the maximum number of attempts per worker (default 3; clamped
    /// to at least 1).
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Supplies a pre-populated context store instead of a fresh one.
    pub fn context(mut self, context: Arc<WorkerContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches an execution observer.
    pub fn monitor(mut self, monitor: Arc<dyn RunMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Replaces the engine's retry-eligibility policy for propagated errors.
    ///
    /// The default honors a domain failure's explicit flag and treats
    /// unclassified errors as retryable.
    pub fn retry_eligibility(
        mut self,
        check: impl Fn(&WorkflowError, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_override = Some(Box::new(check));
        self
    }

    /// Builds the manager with a fresh status and, unless supplied, a fresh
    /// context store.
    pub fn build(self) -> WorkerManager {
        WorkerManager {
            task_id: self.task_id,
            task_name: self.task_name,
            retry_count: self.retry_count.max(1),
            context: self.context.unwrap_or_default(),
            status: RunStatus::new(),
            registry: self.registry,
            monitor: self.monitor,
            worker_stack: Mutex::new(Vec::new()),
            retry_override: self.retry_override,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> WorkerManager {
        WorkerManager::builder("test-task", "Test", Arc::new(WorkerRegistry::new())).build()
    }

    #[test]
    fn test_builder_clamps_retry_count() {
        let manager = WorkerManager::builder("t", "T", Arc::new(WorkerRegistry::new()))
            .retry_count(0)
            .build();
        assert_eq!(manager.retry_count(), 1);
    }

    #[tokio::test]
    async fn test_run_fn_stores_output() {
        let manager = manager();
        let result = manager
            .run_fn("Store", |ctx| async move {
                ctx.set(99u64);
                Ok(WorkerResult::success())
            })
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(manager.context().get::<u64>(), Some(99));
        manager.dispose().await;
    }

    #[tokio::test]
    async fn test_run_map_converts_context_value() {
        let manager = manager();
        manager.set_context(21u32);

        let result = manager.run_map("Double", |x: u32| x * 2).await.unwrap();
        assert!(result.is_success());
        assert_eq!(manager.context().get::<u32>(), Some(42));
        manager.dispose().await;
    }

    #[tokio::test]
    async fn test_map_context_skips_once_failed() {
        let manager = manager();
        manager.set_context(1u32);

        let _ = manager
            .status()
            .try_set_error(ErrorCode::new(9401, "broke"), WorkerName::new("A"));

        manager.map_context(|x: u32| x + 1).unwrap();
        // Unchanged: conversions do not run on failed tasks.
        assert_eq!(manager.context().get::<u32>(), Some(1));
        manager.dispose().await;
    }

    #[tokio::test]
    async fn test_display_lists_workers_in_run_order() {
        let manager = manager();
        let _ = manager
            .run_fn("First", |_ctx| async { Ok(WorkerResult::success()) })
            .await
            .unwrap();
        let _ = manager
            .run_fn("Second", |_ctx| async { Ok(WorkerResult::success()) })
            .await
            .unwrap();

        assert_eq!(
            manager.to_string(),
            "[Test] [OK] WorkerList:First-Second"
        );
        manager.dispose().await;
    }

    #[tokio::test]
    async fn test_resolve_worker_unregistered() {
        let manager = manager();
        let error = manager.resolve_worker::<u32>().unwrap_err();
        assert!(matches!(error, WorkflowError::InvalidOperation(_)));
        manager.dispose().await;
    }
}
