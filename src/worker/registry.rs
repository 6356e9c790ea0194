// src/worker/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{DagQueueError, Result};
use crate::job::{Job, WorkerName};

use super::{EchoWorker, ShellWorker, Worker};

/// Named worker implementations plus the process-wide default.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerName, Arc<dyn Worker>>,
    default: Option<WorkerName>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.workers.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in `shell` and `echo` workers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ShellWorker::NAME, ShellWorker::new());
        registry.register(EchoWorker::NAME, EchoWorker);
        registry
    }

    /// Names of the workers shipped with the crate.
    pub fn builtin_names() -> &'static [&'static str] {
        &[ShellWorker::NAME, EchoWorker::NAME]
    }

    pub fn register(&mut self, name: impl Into<WorkerName>, worker: impl Worker + 'static) {
        self.workers.insert(name.into(), Arc::new(worker));
    }

    /// Set the worker used for jobs that do not name one.
    pub fn set_default(&mut self, name: impl Into<WorkerName>) {
        self.default = Some(name.into());
    }

    pub fn with_default(mut self, name: impl Into<WorkerName>) -> Self {
        self.set_default(name);
        self
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    /// Resolve the worker for `job`: its explicit worker, else the default.
    pub fn resolve(&self, job: &Job) -> Result<Arc<dyn Worker>> {
        let name = match job.worker.as_deref().or(self.default.as_deref()) {
            Some(name) => name,
            None => {
                return Err(DagQueueError::NoWorker {
                    task: job.to_string(),
                    reason: "job names no worker and no default worker is configured".to_string(),
                });
            }
        };

        self.workers
            .get(name)
            .cloned()
            .ok_or_else(|| DagQueueError::NoWorker {
                task: job.to_string(),
                reason: format!("worker '{name}' is not registered"),
            })
    }
}
