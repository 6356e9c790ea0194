// src/scheduler/mod.rs

//! Stage-by-stage driver for queues.
//!
//! [`Scheduler::run_all`] repeatedly asks a queue for its current stage,
//! hands the stage to [`monitor::run_stage`] and stops at the first stage with
//! failures. Stages advance implicitly: every successful job is reported with
//! `finish_job`, which removes it from the head stage, and an emptied head
//! stage is dropped by the queue itself.

pub mod monitor;
pub mod outcome;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::job::Job;
use crate::queue::QueueRegistry;
use crate::worker::WorkerRegistry;

pub use outcome::RunOutcome;

/// Default poll granularity of the monitor loop.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// How long the monitor waits for outcomes per cycle. This never abandons
    /// a running job; it only controls how often progress is observed.
    pub check_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    queues: QueueRegistry,
    workers: Arc<WorkerRegistry>,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(queues: QueueRegistry, workers: WorkerRegistry, options: SchedulerOptions) -> Self {
        Self {
            queues,
            workers: Arc::new(workers),
            options,
        }
    }

    pub fn queues(&self) -> &QueueRegistry {
        &self.queues
    }

    /// Drive queue `name` until it is drained or a stage has failures.
    ///
    /// Safe to call again after [`RunOutcome::Incomplete`]: jobs that already
    /// succeeded have been removed from the queue and are not re-dispatched.
    pub async fn run_all(&self, name: &str) -> Result<RunOutcome> {
        let mut stage_no: u64 = 0;

        loop {
            let jobs = self.queues.current_stage(name).await?;
            if jobs.is_empty() {
                info!(queue = %name, stages = stage_no, "queue finished");
                return Ok(RunOutcome::Finished);
            }

            stage_no += 1;
            debug!(queue = %name, stage = stage_no, jobs = jobs.len(), "running stage");

            let failed = self.run_stage(name, jobs).await?;
            if !failed.is_empty() {
                warn!(
                    queue = %name,
                    stage = stage_no,
                    failed = failed.len(),
                    "stage incomplete; stopping"
                );
                return Ok(RunOutcome::Incomplete(failed));
            }
        }
    }

    /// Dispatch `jobs` concurrently, reporting successes to queue `name`.
    ///
    /// Returns the jobs that failed; empty on full success.
    pub async fn run_stage(&self, name: &str, jobs: Vec<Job>) -> Result<Vec<Job>> {
        monitor::run_stage(
            &self.queues,
            &self.workers,
            self.options.check_interval,
            name,
            jobs,
        )
        .await
    }

    /// Call [`run_all`](Self::run_all), retrying up to `retries` more times
    /// while the queue reports failures.
    pub async fn run_with_retries(&self, name: &str, retries: usize) -> Result<RunOutcome> {
        let mut outcome = self.run_all(name).await?;
        let mut attempt = 0;

        while !outcome.is_finished() && attempt < retries {
            attempt += 1;
            info!(
                queue = %name,
                attempt,
                retries,
                failed = outcome.failed().len(),
                "retrying failed jobs"
            );
            outcome = self.run_all(name).await?;
        }

        Ok(outcome)
    }
}
