// src/scheduler/monitor.rs

//! Dispatch a stage's jobs concurrently and collect their outcomes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::job::{Job, Value};
use crate::queue::QueueRegistry;
use crate::worker::{Worker, WorkerRegistry};

type Outcome = std::result::Result<(task::Id, anyhow::Result<Value>), JoinError>;

/// Jobs in flight for one stage, keyed by the task that runs them.
struct Monitor<'a> {
    queue: &'a str,
    queues: &'a QueueRegistry,
    running: JoinSet<anyhow::Result<Value>>,
    outstanding: HashMap<task::Id, Job>,
    failed: Vec<Job>,
}

/// Run `jobs` concurrently and report successes to queue `queue`.
///
/// Returns the jobs that terminated abnormally (worker error or panic); an
/// empty vector means the whole set succeeded. Every worker is resolved
/// before anything is dispatched, so a configuration error leaves the queue
/// untouched.
///
/// The monitor waits up to `check_interval` per cycle for outcomes and keeps
/// cycling until every dispatched job has produced one. Running jobs are never
/// abandoned: if reporting to the queue fails, the remaining tasks are
/// detached rather than aborted.
pub async fn run_stage(
    queues: &QueueRegistry,
    workers: &WorkerRegistry,
    check_interval: Duration,
    queue: &str,
    jobs: Vec<Job>,
) -> Result<Vec<Job>> {
    if jobs.is_empty() {
        debug!(queue = %queue, "empty job set; nothing to dispatch");
        return Ok(Vec::new());
    }

    let resolved = jobs
        .into_iter()
        .map(|job| workers.resolve(&job).map(|worker| (job, worker)))
        .collect::<Result<Vec<(Job, Arc<dyn Worker>)>>>()?;

    let mut monitor = Monitor {
        queue,
        queues,
        running: JoinSet::new(),
        outstanding: HashMap::new(),
        failed: Vec::new(),
    };

    for (job, worker) in resolved {
        monitor.dispatch(job, worker);
    }

    info!(queue = %queue, jobs = monitor.outstanding.len(), "stage dispatched");

    match monitor.collect(check_interval).await {
        Ok(()) => Ok(monitor.failed),
        Err(e) => {
            warn!(
                queue = %queue,
                outstanding = monitor.outstanding.len(),
                error = %e,
                "stopping monitor; detaching outstanding jobs"
            );
            monitor.running.detach_all();
            Err(e)
        }
    }
}

impl Monitor<'_> {
    fn dispatch(&mut self, job: Job, worker: Arc<dyn Worker>) {
        let input = job.clone();
        let handle = self
            .running
            .spawn(async move { worker.perform(input).await });

        debug!(queue = %self.queue, job = %job, task_id = %handle.id(), "job dispatched");
        self.outstanding.insert(handle.id(), job);
    }

    async fn collect(&mut self, check_interval: Duration) -> Result<()> {
        let mut cycle: u64 = 0;

        while !self.outstanding.is_empty() {
            cycle += 1;

            let first = match timeout(check_interval, self.running.join_next_with_id()).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    warn!(
                        queue = %self.queue,
                        outstanding = self.outstanding.len(),
                        "join set drained with jobs still outstanding"
                    );
                    self.failed.extend(self.outstanding.drain().map(|(_, job)| job));
                    break;
                }
                Err(_) => {
                    debug!(
                        queue = %self.queue,
                        cycle,
                        outstanding = self.outstanding.len(),
                        "no outcomes this cycle; still waiting"
                    );
                    continue;
                }
            };

            let mut batch = vec![first];
            while let Some(more) = self.running.try_join_next_with_id() {
                batch.push(more);
            }

            debug!(queue = %self.queue, cycle, outcomes = batch.len(), "collected outcomes");

            for outcome in batch {
                self.handle_outcome(outcome).await?;
            }
        }

        Ok(())
    }

    async fn handle_outcome(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Ok((id, Ok(value))) => {
                let Some(job) = self.outstanding.remove(&id) else {
                    warn!(queue = %self.queue, task_id = %id, "outcome for unknown task; ignoring");
                    return Ok(());
                };
                debug!(queue = %self.queue, job = %job, result = %value, "job succeeded");
                self.queues.finish_job(self.queue, job, value).await?;
            }
            Ok((id, Err(err))) => {
                if let Some(job) = self.outstanding.remove(&id) {
                    warn!(queue = %self.queue, job = %job, error = %err, "job failed");
                    self.failed.push(job);
                }
            }
            Err(join_err) => {
                let id = join_err.id();
                if let Some(job) = self.outstanding.remove(&id) {
                    if join_err.is_panic() {
                        warn!(queue = %self.queue, job = %job, "job panicked");
                    } else {
                        warn!(queue = %self.queue, job = %job, error = %join_err, "job task terminated");
                    }
                    self.failed.push(job);
                }
            }
        }

        Ok(())
    }
}
