// src/queue/registry.rs

//! Name -> queue handle registry and lifecycle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::errors::{DagQueueError, Result};
use crate::job::{Job, QueueName, Value};
use crate::queue::server::{QueueHandle, QueueServer};
use crate::queue::stage::Stage;

/// Registry of live queues, keyed by name.
///
/// Cloning is cheap; all clones share the same map. At most one queue is live
/// per name. The map lock is only ever held for lookups and inserts, never
/// across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct QueueRegistry {
    queues: Arc<Mutex<HashMap<QueueName, QueueHandle>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueueName, QueueHandle>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a queue named `name` with the given stage list.
    ///
    /// Fails with [`DagQueueError::QueueExists`] if the name is taken. Must be
    /// called from within a Tokio runtime.
    pub fn start_queue(&self, name: impl Into<QueueName>, work: Vec<Stage>) -> Result<QueueHandle> {
        let name = name.into();
        let mut queues = self.lock();

        if queues.contains_key(&name) {
            return Err(DagQueueError::QueueExists(name));
        }

        info!(queue = %name, stages = work.len(), "starting queue");
        let handle = QueueServer::spawn(name.clone(), work, self.clone());
        queues.insert(name, handle.clone());

        Ok(handle)
    }

    /// Stop the queue named `name` and any nested queues its remaining work
    /// still references.
    pub async fn stop_queue(&self, name: &str) -> Result<()> {
        let handle = self
            .lock()
            .remove(name)
            .ok_or_else(|| DagQueueError::QueueNotFound(name.to_string()))?;

        info!(queue = %name, "stopping queue");
        handle.shutdown().await
    }

    /// Stop every registered queue.
    pub async fn stop_all(&self) {
        for name in self.names() {
            // Nested queues may already have been stopped by their parent.
            let _ = self.stop_queue(&name).await;
        }
    }

    pub fn get(&self, name: &str) -> Result<QueueHandle> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| DagQueueError::QueueNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Names of all live queues, sorted.
    pub fn names(&self) -> Vec<QueueName> {
        let mut names: Vec<QueueName> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn current_stage(&self, name: &str) -> Result<Vec<Job>> {
        self.get(name)?.current_stage().await
    }

    pub async fn complete_stage(&self, name: &str) -> Result<()> {
        self.get(name)?.complete_stage().await
    }

    pub async fn finish_job(&self, name: &str, job: Job, result: Value) -> Result<()> {
        self.get(name)?.finish_job(job, result).await
    }

    pub async fn completed(&self, name: &str) -> Result<HashSet<Job>> {
        self.get(name)?.completed().await
    }

    /// Alias for [`stop_queue`](Self::stop_queue).
    pub async fn shutdown(&self, name: &str) -> Result<()> {
        self.stop_queue(name).await
    }
}
