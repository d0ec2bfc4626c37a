//! Commonly used types and traits

pub use crate::context::WorkerContext;
pub use crate::error::WorkflowError;
pub use crate::manager::WorkerManager;
pub use crate::registry::WorkerRegistry;
pub use crate::result::{TypedResult, WorkerResult};
pub use crate::worker::{TypedWorker, Worker, WorkerName};
