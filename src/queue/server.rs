// src/queue/server.rs

//! Per-queue actor.
//!
//! Every queue runs as its own Tokio task ([`QueueServer`]) that owns a
//! [`QueueState`] and processes [`QueueCommand`]s one at a time. This gives
//! single-writer serialization per queue without any locking inside the
//! queue. Callers talk to the task through a cloneable [`QueueHandle`].
//!
//! Nested delegation is handled here: while processing a command for the
//! outer queue, the server calls into the inner queue's handle (looked up in
//! the [`QueueRegistry`]). The two queues are serialized independently, so a
//! third party operating on the inner queue between the outer queue's read
//! and its follow-up write can interleave with it. Delegation is assumed to be
//! single-consumer.

use std::collections::HashSet;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{DagQueueError, Result};
use crate::job::{contains_job, Job, QueueName, Value};
use crate::queue::registry::QueueRegistry;
use crate::queue::stage::{Stage, StageEntry};
use crate::queue::state::QueueState;

/// Requests processed by a queue task.
#[derive(Debug)]
pub enum QueueCommand {
    CurrentStage {
        reply: oneshot::Sender<Result<Vec<Job>>>,
    },
    CompleteStage {
        reply: oneshot::Sender<Result<()>>,
    },
    FinishJob {
        job: Job,
        result: Value,
        reply: oneshot::Sender<Result<()>>,
    },
    Completed {
        reply: oneshot::Sender<HashSet<Job>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running queue task.
///
/// Once the queue has been shut down every call fails with
/// [`DagQueueError::QueueNotFound`].
#[derive(Debug, Clone)]
pub struct QueueHandle {
    name: QueueName,
    tx: mpsc::Sender<QueueCommand>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Jobs that can be dispatched right now, with nested queues expanded.
    pub async fn current_stage(&self) -> Result<Vec<Job>> {
        self.request(|reply| QueueCommand::CurrentStage { reply })
            .await?
    }

    /// Pop the head stage, recording all of its direct jobs as finished.
    pub async fn complete_stage(&self) -> Result<()> {
        self.request(|reply| QueueCommand::CompleteStage { reply })
            .await?
    }

    /// Mark one job as done with `result`.
    pub async fn finish_job(&self, job: Job, result: Value) -> Result<()> {
        self.request(|reply| QueueCommand::FinishJob { job, result, reply })
            .await?
    }

    /// Snapshot of the finished set.
    pub async fn completed(&self) -> Result<HashSet<Job>> {
        self.request(|reply| QueueCommand::Completed { reply }).await
    }

    /// Stop the queue task. Registry bookkeeping is done by
    /// [`QueueRegistry::stop_queue`], which is the public entry point.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.request(|reply| QueueCommand::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| DagQueueError::QueueNotFound(self.name.clone()))?;
        reply_rx
            .await
            .map_err(|_| DagQueueError::QueueNotFound(self.name.clone()))
    }
}

/// The task that owns one queue's state.
pub struct QueueServer {
    state: QueueState,
    registry: QueueRegistry,
    rx: mpsc::Receiver<QueueCommand>,
}

impl QueueServer {
    /// Spawn the queue task and return a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(name: QueueName, work: Vec<Stage>, registry: QueueRegistry) -> QueueHandle {
        let (tx, rx) = mpsc::channel::<QueueCommand>(32);
        let server = QueueServer {
            state: QueueState::new(name.clone(), work),
            registry,
            rx,
        };

        tokio::spawn(server.run());

        QueueHandle { name, tx }
    }

    async fn run(mut self) {
        debug!(queue = %self.state.name(), "queue task started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                QueueCommand::CurrentStage { reply } => {
                    let _ = reply.send(self.current_stage().await);
                }
                QueueCommand::CompleteStage { reply } => {
                    let _ = reply.send(self.complete_stage().await);
                }
                QueueCommand::FinishJob { job, result, reply } => {
                    let _ = reply.send(self.finish_job(job, result).await);
                }
                QueueCommand::Completed { reply } => {
                    let _ = reply.send(self.state.finished().clone());
                }
                QueueCommand::Shutdown { reply } => {
                    self.teardown_children(self.state.referenced_queues()).await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        debug!(queue = %self.state.name(), "queue task finished");
    }

    /// Expand the head stage. Nested queues with nothing left to offer are
    /// torn down and dropped from the head; if that empties the head, the
    /// next stage is read instead.
    async fn current_stage(&mut self) -> Result<Vec<Job>> {
        loop {
            let Some(head) = self.state.head() else {
                return Ok(Vec::new());
            };

            let mut jobs = Vec::new();
            let mut drained = Vec::new();
            for entry in head.entries() {
                match entry {
                    StageEntry::Job(job) => jobs.push(job),
                    StageEntry::Queue(nested) => {
                        let inner = self.registry.get(&nested)?;
                        let inner_jobs = inner.current_stage().await?;
                        if inner_jobs.is_empty() {
                            drained.push(nested);
                        } else {
                            jobs.extend(inner_jobs);
                        }
                    }
                }
            }

            if drained.is_empty() {
                return Ok(jobs);
            }

            for nested in drained {
                info!(
                    queue = %self.state.name(),
                    nested = %nested,
                    "nested queue has no work left; tearing it down"
                );
                self.teardown_children(vec![nested.clone()]).await;
                self.state.remove_nested_ref(&nested);
            }

            if !jobs.is_empty() {
                return Ok(jobs);
            }
        }
    }

    async fn complete_stage(&mut self) -> Result<()> {
        match self.state.pop_stage() {
            Some(stage) => {
                self.teardown_children(stage.nested_queues()).await;
                Ok(())
            }
            None => {
                debug!(queue = %self.state.name(), "complete_stage on drained queue; nothing to do");
                Ok(())
            }
        }
    }

    async fn finish_job(&mut self, job: Job, result: Value) -> Result<()> {
        if self.state.remove_from_head(&job) {
            self.state.record_finished(job.clone().with_result(result));
            debug!(queue = %self.state.name(), job = %job, "job finished");
            return Ok(());
        }

        for nested in self.state.head_nested() {
            let inner = self.registry.get(&nested)?;
            if !contains_job(&inner.current_stage().await?, &job) {
                continue;
            }

            debug!(
                queue = %self.state.name(),
                nested = %nested,
                job = %job,
                "delegating job completion to nested queue"
            );
            inner.finish_job(job.clone(), result.clone()).await?;
            self.state.record_finished(job.with_result(result));

            if inner.current_stage().await?.is_empty() {
                info!(
                    queue = %self.state.name(),
                    nested = %nested,
                    "nested queue drained; tearing it down"
                );
                self.teardown_children(vec![nested.clone()]).await;
                self.state.remove_nested_ref(&nested);
            }

            return Ok(());
        }

        warn!(
            queue = %self.state.name(),
            job = %job,
            "finished job is not part of the current stage; ignoring"
        );
        Ok(())
    }

    async fn teardown_children(&self, children: Vec<QueueName>) {
        for child in children {
            match self.registry.stop_queue(&child).await {
                Ok(()) => {
                    debug!(queue = %self.state.name(), nested = %child, "nested queue stopped");
                }
                Err(DagQueueError::QueueNotFound(_)) => {
                    debug!(queue = %self.state.name(), nested = %child, "nested queue already stopped");
                }
                Err(e) => {
                    warn!(
                        queue = %self.state.name(),
                        nested = %child,
                        error = %e,
                        "failed to stop nested queue"
                    );
                }
            }
        }
    }
}
