// src/job/mod.rs

//! Job descriptors and the identity rules used to match them.
//!
//! A [`Job`] is an immutable task description (`task`, `worker`, `args`) plus
//! two fields the system fills in while processing it:
//! - `result`, attached when the job completes;
//! - `queue`, the name of the queue that owns the job.
//!
//! Two jobs are the *same job* when their task, worker and args are equal
//! (see [`Job::same_job`]). The derived `Eq`/`Hash` compare every field so
//! that finished sets keep the result each job completed with.

pub mod value;

use std::fmt;

use serde::Deserialize;

pub use value::Value;

/// Canonical queue name type.
pub type QueueName = String;

/// Name under which a worker implementation is registered.
pub type WorkerName = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    /// Opaque identifier for the unit of work.
    pub task: Value,

    /// Worker that should run this job; `None` means the process-wide default.
    #[serde(default)]
    pub worker: Option<WorkerName>,

    #[serde(default)]
    pub args: Vec<Value>,

    /// Outcome of execution; unset until the job completes.
    #[serde(skip)]
    pub result: Option<Value>,

    /// Queue that currently owns this job.
    #[serde(skip)]
    pub queue: Option<QueueName>,
}

impl Job {
    pub fn new(task: impl Into<Value>) -> Self {
        Self {
            task: task.into(),
            worker: None,
            args: Vec::new(),
            result: None,
            queue: None,
        }
    }

    pub fn with_worker(mut self, worker: impl Into<WorkerName>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Return a copy of this job carrying `result`.
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Identity comparison: task, worker and args only.
    ///
    /// `result` and `queue` are ignored, so a job handed out by
    /// `current_stage` still matches the copy stored in the stage list after
    /// a result has been attached to it.
    pub fn same_job(&self, other: &Job) -> bool {
        self.task == other.task && self.worker == other.worker && self.args == other.args
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.task)?;
        if !self.args.is_empty() {
            write!(f, "{}", Value::List(self.args.clone()))?;
        }
        if let Some(ref worker) = self.worker {
            write!(f, "@{worker}")?;
        }
        Ok(())
    }
}

/// Position of the first job in `jobs` that is the same job as `needle`.
pub fn position_of(jobs: &[Job], needle: &Job) -> Option<usize> {
    jobs.iter().position(|j| j.same_job(needle))
}

/// Whether `jobs` contains the same job as `needle`.
pub fn contains_job(jobs: &[Job], needle: &Job) -> bool {
    position_of(jobs, needle).is_some()
}
