// src/queue/stage.rs

//! Stage list elements.

use serde::Deserialize;

use crate::job::{Job, QueueName};

/// One entry in a queue's work list.
///
/// - `Job`: a single job.
/// - `Queue`: delegation to another named queue; its current stage is spliced
///   into this one when the stage is read.
/// - `Group`: a parallel group; its members may themselves be jobs, queue
///   references or further groups.
///
/// In TOML a string is a queue reference, a table is a job and an array is a
/// group:
///
/// ```toml
/// stages = [[{ task = "a" }, "inner"], { task = "b" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Stage {
    Queue(QueueName),
    Job(Job),
    Group(Vec<Stage>),
}

impl Stage {
    pub fn job(job: Job) -> Self {
        Stage::Job(job)
    }

    pub fn nested(name: impl Into<QueueName>) -> Self {
        Stage::Queue(name.into())
    }

    pub fn group(items: impl IntoIterator<Item = Stage>) -> Self {
        Stage::Group(items.into_iter().collect())
    }

    /// Convenience for the common case of a group made only of jobs.
    pub fn jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        Stage::Group(jobs.into_iter().map(Stage::Job).collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Stage::Group(items) if items.is_empty())
    }

    /// Set `queue` on every job owned directly by this stage. Queue
    /// references are not followed.
    pub fn tag_jobs(&mut self, queue: &str) {
        match self {
            Stage::Job(job) => job.queue = Some(queue.to_string()),
            Stage::Queue(_) => {}
            Stage::Group(items) => {
                for item in items.iter_mut() {
                    item.tag_jobs(queue);
                }
            }
        }
    }

    /// Drop empty groups, recursively. Returns `None` if nothing is left.
    pub fn pruned(self) -> Option<Stage> {
        match self {
            Stage::Group(items) => {
                let items: Vec<Stage> = items.into_iter().filter_map(Stage::pruned).collect();
                if items.is_empty() {
                    None
                } else {
                    Some(Stage::Group(items))
                }
            }
            other => Some(other),
        }
    }

    /// Leaves of this stage (jobs and queue references), flattened through
    /// groups in declaration order.
    pub fn entries(&self) -> Vec<StageEntry> {
        let mut out = Vec::new();
        self.collect_entries(&mut out);
        out
    }

    fn collect_entries(&self, out: &mut Vec<StageEntry>) {
        match self {
            Stage::Job(job) => out.push(StageEntry::Job(job.clone())),
            Stage::Queue(name) => out.push(StageEntry::Queue(name.clone())),
            Stage::Group(items) => items.iter().for_each(|i| i.collect_entries(out)),
        }
    }

    /// Jobs owned directly by this stage, in declaration order.
    pub fn direct_jobs(&self) -> Vec<Job> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                StageEntry::Job(job) => Some(job),
                StageEntry::Queue(_) => None,
            })
            .collect()
    }

    /// Names of queues this stage delegates to, in declaration order.
    pub fn nested_queues(&self) -> Vec<QueueName> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                StageEntry::Queue(name) => Some(name),
                StageEntry::Job(_) => None,
            })
            .collect()
    }

    /// Remove the first element (at any group depth) for which `pred` holds.
    ///
    /// Sub-groups emptied by the removal are removed as well. A leaf stage
    /// never removes itself; the owner of the stage list handles that case.
    pub fn remove_first<F>(&mut self, pred: &F) -> bool
    where
        F: Fn(&Stage) -> bool,
    {
        let Stage::Group(items) = self else {
            return false;
        };

        for idx in 0..items.len() {
            if pred(&items[idx]) {
                items.remove(idx);
                return true;
            }
            if items[idx].remove_first(pred) {
                if items[idx].is_empty() {
                    items.remove(idx);
                }
                return true;
            }
        }

        false
    }

    /// Whether this stage is, itself, the given job (by identity).
    pub fn is_job(&self, job: &Job) -> bool {
        matches!(self, Stage::Job(j) if j.same_job(job))
    }

    /// Whether this stage is, itself, a reference to `queue`.
    pub fn is_queue_ref(&self, queue: &str) -> bool {
        matches!(self, Stage::Queue(name) if name == queue)
    }
}

/// A flattened stage leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEntry {
    Job(Job),
    Queue(QueueName),
}

impl From<Job> for Stage {
    fn from(job: Job) -> Self {
        Stage::Job(job)
    }
}
