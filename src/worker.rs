//! Worker traits and related types.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::WorkerContext;
use crate::error::WorkflowError;
use crate::manager::WorkerManager;
use crate::result::{TypedResult, WorkerResult};

/// Type-safe worker name wrapper.
///
/// Used for debugging, status reporting and monitor hooks.
///
/// # Examples
///
/// ```
/// use itonami::WorkerName;
///
/// let name = WorkerName::new("FetchWorker");
/// assert_eq!(name.as_str(), "FetchWorker");
///
/// let name: WorkerName = "ParseWorker".into();
/// assert_eq!(name.as_str(), "ParseWorker");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerName(String);

impl WorkerName {
    /// Creates a new WorkerName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a WorkerName from a type's name (extracts the last segment).
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.split("::").last().unwrap_or("UnknownWorker");
        Self::new(short_name)
    }

    /// Returns the worker name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkerName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for WorkerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One unit of work in a task.
///
/// The engine runs workers through
/// [`WorkerManager::run_worker`](crate::WorkerManager::run_worker), applying
/// the manager's retry policy around [`execute`](Worker::execute). The
/// manager is passed explicitly to every invocation; workers hold no bound
/// state and may drive nested sub-workers through it.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use itonami::{Worker, WorkerManager, WorkerResult, WorkflowError};
///
/// struct GreetWorker;
///
/// #[async_trait]
/// impl Worker for GreetWorker {
///     async fn execute(
///         &self,
///         manager: &WorkerManager,
///     ) -> Result<WorkerResult, WorkflowError> {
///         manager.context().set("hello".to_string());
///         Ok(WorkerResult::success())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync {
    /// The worker's name. Defaults to the implementing type's name.
    fn name(&self) -> WorkerName {
        WorkerName::from_type_name::<Self>()
    }

    /// Whether the engine may re-run this worker after a retryable failure.
    fn can_retry(&self) -> bool {
        true
    }

    /// The delay the engine waits before each attempt after the first.
    fn retry_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Whether this worker still runs once the task has failed (cleanup and
    /// reporting steps). Defaults to `false`: failed tasks skip the worker.
    fn can_run_when_fail(&self) -> bool {
        false
    }

    /// Performs one attempt of this worker's unit of work.
    async fn execute(&self, manager: &WorkerManager) -> Result<WorkerResult, WorkflowError>;

    /// Called during manager disposal, in reverse execution order. Cleanup
    /// errors are logged and discarded so every worker gets a chance.
    async fn on_dispose(&self, _context: &WorkerContext) -> Result<(), WorkflowError> {
        Ok(())
    }
}

/// A worker with a typed input read from the context and a typed output
/// written back into it.
///
/// Implementors receive their input already extracted and validated; a
/// missing input raises the hard-stop
/// [`WorkflowError::InputNotFound`](crate::WorkflowError::InputNotFound)
/// before [`process`](TypedWorker::process) is reached. On success the
/// output value is stored into the context, making it available to the next
/// chained step. Input-only workers use `Output = ()`.
///
/// Every `TypedWorker` is a [`Worker`] and can be passed to
/// [`WorkerManager::run_worker`](crate::WorkerManager::run_worker) directly,
/// or driven as a sub-step with an explicit input through
/// [`WorkerManager::run_typed`](crate::WorkerManager::run_typed).
#[async_trait]
pub trait TypedWorker: Send + Sync {
    /// The input type read from the context.
    type Input: Any + Clone + Send + Sync;
    /// The output type written back into the context on success.
    type Output: Any + Clone + Send + Sync;

    /// The worker's name. Defaults to the implementing type's name.
    fn name(&self) -> WorkerName {
        WorkerName::from_type_name::<Self>()
    }

    /// Whether the engine may re-run this worker after a retryable failure.
    fn can_retry(&self) -> bool {
        true
    }

    /// The delay the engine waits before each attempt after the first.
    fn retry_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Whether this worker still runs once the task has failed.
    fn can_run_when_fail(&self) -> bool {
        false
    }

    /// Performs one attempt on the extracted input.
    async fn process(
        &self,
        input: Self::Input,
        manager: &WorkerManager,
    ) -> Result<TypedResult<Self::Output>, WorkflowError>;

    /// Called during manager disposal, in reverse execution order.
    async fn on_dispose(&self, _context: &WorkerContext) -> Result<(), WorkflowError> {
        Ok(())
    }
}

#[async_trait]
impl<W: TypedWorker> Worker for W {
    fn name(&self) -> WorkerName {
        TypedWorker::name(self)
    }

    fn can_retry(&self) -> bool {
        TypedWorker::can_retry(self)
    }

    fn retry_delay(&self) -> Duration {
        TypedWorker::retry_delay(self)
    }

    fn can_run_when_fail(&self) -> bool {
        TypedWorker::can_run_when_fail(self)
    }

    async fn execute(&self, manager: &WorkerManager) -> Result<WorkerResult, WorkflowError> {
        let input = manager.context().get::<W::Input>().ok_or_else(|| {
            WorkflowError::InputNotFound {
                worker_name: TypedWorker::name(self),
                type_name: std::any::type_name::<W::Input>(),
            }
        })?;

        let result = self.process(input, manager).await?;

        if let Some(value) = result.value() {
            manager.context().set(value.clone());
        }

        Ok(result.to_worker_result())
    }

    async fn on_dispose(&self, context: &WorkerContext) -> Result<(), WorkflowError> {
        TypedWorker::on_dispose(self, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SampleWorker;

    #[test]
    fn test_worker_name_from_type() {
        assert_eq!(
            WorkerName::from_type_name::<SampleWorker>(),
            WorkerName::new("SampleWorker")
        );
    }

    #[test]
    fn test_worker_name_conversions() {
        let a = WorkerName::new("W");
        let b: WorkerName = "W".into();
        let c: WorkerName = "W".to_string().into();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "W");
        assert_eq!(a.to_string(), "W");
    }
}
