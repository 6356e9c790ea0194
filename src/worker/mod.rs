// src/worker/mod.rs

//! Worker capability.
//!
//! A worker performs the business logic of a job. The scheduler never looks
//! inside a job; it resolves a worker through the [`WorkerRegistry`] and calls
//! [`Worker::perform`].
//!
//! - [`registry`] maps worker names to implementations and holds the
//!   process-wide default.
//! - [`shell`] runs the job's task as a shell command.
//! - [`echo`] returns the job's task and args unchanged (handy for dry runs
//!   and tests).

pub mod echo;
pub mod registry;
pub mod shell;

use std::future::Future;
use std::pin::Pin;

use crate::job::{Job, Value};

pub use echo::EchoWorker;
pub use registry::WorkerRegistry;
pub use shell::ShellWorker;

/// Boxed future returned by [`Worker::perform`].
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// Trait abstracting how a single job is executed.
///
/// Returning `Ok(value)` is a normal completion, including `Ok(Value::Null)`.
/// Returning `Err` or panicking is an abnormal termination: the job is
/// reported as failed and stays pending in its queue.
pub trait Worker: Send + Sync {
    fn perform(&self, job: Job) -> WorkFuture<'_>;
}
