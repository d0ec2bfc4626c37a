//! # Itonami (営)
//!
//! A lightweight worker execution engine for Rust.
//!
//! The name "Itonami" (営) means "the carrying on of work" in Japanese,
//! reflecting how this engine carries a task through its workers step by
//! step, keeping track of the first failure along the way.
//!
//! ## Features
//!
//! - **Type-safe chaining**: [`TypedWorker`] reads its input from a
//!   type-keyed context and writes its output back for the next step
//! - **Async First**: Built with `async-trait` for asynchronous workers
//! - **Retry Support**: Per-worker retry opt-out and delay, engine-wide
//!   attempt count
//! - **First-failure-wins status**: One [`RunStatus`] per task records the
//!   earliest failure; later workers are skipped unless they opt in
//! - **Composable**: Workers drive nested sub-workers through the same
//!   [`WorkerManager`]
//! - **Deterministic cleanup**: [`WorkerManager::dispose`] runs every
//!   executed worker's cleanup in reverse order
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use itonami::prelude::*;
//!
//! struct GreetWorker;
//!
//! #[async_trait]
//! impl TypedWorker for GreetWorker {
//!     type Input = String;
//!     type Output = usize;
//!
//!     async fn process(
//!         &self,
//!         input: String,
//!         _manager: &WorkerManager,
//!     ) -> Result<TypedResult<usize>, WorkflowError> {
//!         Ok(TypedResult::from_value(input.len()))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(WorkerRegistry::new());
//! let manager = WorkerManager::builder("task-1", "Greeting", registry).build();
//!
//! manager.set_context("hello".to_string());
//! let result = manager.run_worker(GreetWorker).await.expect("run failed");
//!
//! assert!(result.is_success());
//! assert_eq!(manager.context().get::<usize>(), Some(5));
//! manager.dispose().await;
//! # }
//! ```
//!
//! ## Failure and Skipping
//!
//! The first failing worker fixes the task status; later workers are
//! skipped and return a failure mirroring that status, unless they declare
//! [`Worker::can_run_when_fail`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use itonami::prelude::*;
//! use itonami::ErrorCode;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(WorkerRegistry::new());
//! let manager = WorkerManager::builder("task-2", "Failing", registry).build();
//!
//! let failed = manager
//!     .run_fn("Break", |_ctx| async {
//!         Ok(WorkerResult::fail(ErrorCode::new(7100, "backend down"), false))
//!     })
//!     .await
//!     .expect("run failed");
//! assert!(failed.is_fail());
//!
//! // Skipped: the task has already failed.
//! let skipped = manager
//!     .run_fn("Never", |_ctx| async { Ok(WorkerResult::success()) })
//!     .await
//!     .expect("run failed");
//! assert!(skipped.is_fail());
//! assert_eq!(manager.status().code().code(), 7100);
//! manager.dispose().await;
//! # }
//! ```

mod code;
mod context;
mod delegate;
mod error;
mod manager;
mod monitor;
mod registry;
mod result;
mod status;
mod worker;

pub mod prelude;

pub use code::{ErrorCode, ErrorCodeRegistry};
pub use context::WorkerContext;
pub use delegate::{FnWorker, MapWorker};
pub use error::WorkflowError;
pub use manager::{WorkerManager, WorkerManagerBuilder};
pub use monitor::RunMonitor;
pub use registry::WorkerRegistry;
pub use result::{TypedResult, WorkerResult};
pub use status::{RunStatus, StatusSnapshot};
pub use worker::{TypedWorker, Worker, WorkerName};
