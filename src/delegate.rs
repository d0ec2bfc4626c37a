//! Adapters that let inline functions run as workers.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::WorkerContext;
use crate::error::WorkflowError;
use crate::manager::WorkerManager;
use crate::result::{TypedResult, WorkerResult};
use crate::worker::{TypedWorker, Worker, WorkerName};

type BoxedResultFuture = Pin<Box<dyn Future<Output = Result<WorkerResult, WorkflowError>> + Send>>;
type BoxedTask = Box<dyn Fn(Arc<WorkerContext>) -> BoxedResultFuture + Send + Sync>;

/// A [`Worker`] wrapping an inline async closure over the raw context.
///
/// # Examples
///
/// ```
/// use itonami::{FnWorker, WorkerResult};
///
/// let worker = FnWorker::new("StoreGreeting", |ctx| async move {
///     ctx.set("hello".to_string());
///     Ok(WorkerResult::success())
/// });
/// assert_eq!(worker.worker_name().as_str(), "StoreGreeting");
/// ```
pub struct FnWorker {
    name: WorkerName,
    can_run_when_fail: bool,
    task: BoxedTask,
}

impl FnWorker {
    /// Wraps `task` as a worker with an explicit name.
    pub fn new<F, Fut>(name: impl Into<WorkerName>, task: F) -> Self
    where
        F: Fn(Arc<WorkerContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WorkerResult, WorkflowError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            can_run_when_fail: false,
            task: Box::new(move |ctx| Box::pin(task(ctx))),
        }
    }

    /// Wraps `task` as a worker named after the closure's type.
    pub fn from_fn<F, Fut>(task: F) -> Self
    where
        F: Fn(Arc<WorkerContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WorkerResult, WorkflowError>> + Send + 'static,
    {
        let name = WorkerName::from_type_name::<F>();
        Self::new(name, task)
    }

    /// Permits this worker to run even after the task has failed.
    pub fn run_when_fail(mut self) -> Self {
        self.can_run_when_fail = true;
        self
    }

    /// The adapter's worker name.
    pub fn worker_name(&self) -> &WorkerName {
        &self.name
    }
}

impl fmt::Debug for FnWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWorker")
            .field("name", &self.name)
            .field("can_run_when_fail", &self.can_run_when_fail)
            .finish()
    }
}

#[async_trait]
impl Worker for FnWorker {
    fn name(&self) -> WorkerName {
        self.name.clone()
    }

    fn can_run_when_fail(&self) -> bool {
        self.can_run_when_fail
    }

    async fn execute(&self, manager: &WorkerManager) -> Result<WorkerResult, WorkflowError> {
        (self.task)(manager.context_arc()).await
    }
}

/// A [`TypedWorker`] wrapping a plain `Fn(I) -> O` conversion.
///
/// The input is read from the context (raising the hard-stop input-not-found
/// error when absent) and the output is written back on success, like any
/// typed worker.
pub struct MapWorker<I, O, F> {
    name: WorkerName,
    can_run_when_fail: bool,
    map: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> MapWorker<I, O, F>
where
    F: Fn(I) -> O + Send + Sync,
{
    /// Wraps `map` as a typed worker with an explicit name.
    pub fn new(name: impl Into<WorkerName>, map: F) -> Self {
        Self {
            name: name.into(),
            can_run_when_fail: false,
            map,
            _marker: PhantomData,
        }
    }

    /// Wraps `map` as a typed worker named after the closure's type.
    pub fn from_fn(map: F) -> Self {
        let name = WorkerName::from_type_name::<F>();
        Self::new(name, map)
    }

    /// Permits this worker to run even after the task has failed.
    pub fn run_when_fail(mut self) -> Self {
        self.can_run_when_fail = true;
        self
    }
}

impl<I, O, F> fmt::Debug for MapWorker<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapWorker")
            .field("name", &self.name)
            .field("can_run_when_fail", &self.can_run_when_fail)
            .finish()
    }
}

#[async_trait]
impl<I, O, F> TypedWorker for MapWorker<I, O, F>
where
    I: Any + Clone + Send + Sync,
    O: Any + Clone + Send + Sync,
    F: Fn(I) -> O + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> WorkerName {
        self.name.clone()
    }

    fn can_run_when_fail(&self) -> bool {
        self.can_run_when_fail
    }

    async fn process(
        &self,
        input: I,
        _manager: &WorkerManager,
    ) -> Result<TypedResult<O>, WorkflowError> {
        Ok(TypedResult::from_value((self.map)(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_worker_flags() {
        let worker = FnWorker::new("Cleanup", |_ctx| async { Ok(WorkerResult::success()) });
        assert!(!Worker::can_run_when_fail(&worker));

        let worker = worker.run_when_fail();
        assert!(Worker::can_run_when_fail(&worker));
        assert_eq!(Worker::name(&worker), WorkerName::new("Cleanup"));
    }

    #[test]
    fn test_map_worker_name() {
        let worker = MapWorker::new("Double", |x: u32| x * 2);
        assert_eq!(TypedWorker::name(&worker), WorkerName::new("Double"));
    }
}
