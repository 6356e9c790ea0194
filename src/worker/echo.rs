// src/worker/echo.rs

use crate::job::{Job, Value};

use super::{WorkFuture, Worker};

/// Returns `[task, args...]` without doing any work.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoWorker;

impl EchoWorker {
    pub const NAME: &'static str = "echo";
}

impl Worker for EchoWorker {
    fn perform(&self, job: Job) -> WorkFuture<'_> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(job.args.len() + 1);
            out.push(job.task);
            out.extend(job.args);
            Ok(Value::List(out))
        })
    }
}
