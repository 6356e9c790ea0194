// src/queue/state.rs

//! Pure per-queue state machine.
//!
//! `QueueState` owns one queue's remaining stage list and its finished set.
//! It has no channels and performs no IO; nested-queue delegation is driven by
//! the [`server`](super::server) task, which uses the helpers here to inspect
//! and edit the head stage.
//!
//! Invariants:
//! - `work` only shrinks at the front; stages are never reordered.
//! - `finished` only grows.
//! - The head stage is never an empty group (emptied heads are popped).

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::job::{Job, QueueName};
use crate::queue::stage::Stage;

#[derive(Debug)]
pub struct QueueState {
    name: QueueName,
    work: VecDeque<Stage>,
    finished: HashSet<Job>,
}

impl QueueState {
    /// Build the state for `name`, tagging every directly-owned job with the
    /// queue name and dropping empty groups.
    pub fn new(name: impl Into<QueueName>, work: Vec<Stage>) -> Self {
        let name = name.into();
        let work: VecDeque<Stage> = work
            .into_iter()
            .filter_map(Stage::pruned)
            .map(|mut stage| {
                stage.tag_jobs(&name);
                stage
            })
            .collect();

        debug!(queue = %name, stages = work.len(), "queue state initialised");

        Self {
            name,
            work,
            finished: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` once every stage has been consumed.
    pub fn is_drained(&self) -> bool {
        self.work.is_empty()
    }

    pub fn remaining_stages(&self) -> usize {
        self.work.len()
    }

    pub fn head(&self) -> Option<&Stage> {
        self.work.front()
    }

    /// Jobs owned directly by the head stage.
    pub fn head_jobs(&self) -> Vec<Job> {
        self.head().map(Stage::direct_jobs).unwrap_or_default()
    }

    /// Queues the head stage delegates to.
    pub fn head_nested(&self) -> Vec<QueueName> {
        self.head().map(Stage::nested_queues).unwrap_or_default()
    }

    /// Every queue referenced anywhere in the remaining work.
    pub fn referenced_queues(&self) -> Vec<QueueName> {
        self.work.iter().flat_map(Stage::nested_queues).collect()
    }

    pub fn finished(&self) -> &HashSet<Job> {
        &self.finished
    }

    /// Pop the head stage unconditionally, recording its direct jobs as
    /// finished. The popped stage is returned so the caller can deal with any
    /// queues it referenced.
    pub fn pop_stage(&mut self) -> Option<Stage> {
        let stage = self.work.pop_front()?;
        let jobs = stage.direct_jobs();
        debug!(
            queue = %self.name,
            jobs = jobs.len(),
            remaining = self.work.len(),
            "stage completed"
        );
        self.finished.extend(jobs);
        Some(stage)
    }

    /// Add a completed job (already carrying its result) to the finished set.
    pub fn record_finished(&mut self, job: Job) {
        self.finished.insert(job);
    }

    /// Remove `job` (matched by identity) from the head stage.
    ///
    /// Returns `false` if the head stage does not own the job directly.
    pub fn remove_from_head(&mut self, job: &Job) -> bool {
        self.remove_from_head_where(|s| s.is_job(job))
    }

    /// Remove the reference to `queue` from the head stage.
    pub fn remove_nested_ref(&mut self, queue: &str) -> bool {
        self.remove_from_head_where(|s| s.is_queue_ref(queue))
    }

    fn remove_from_head_where<F>(&mut self, pred: F) -> bool
    where
        F: Fn(&Stage) -> bool,
    {
        let Some(head) = self.work.front_mut() else {
            return false;
        };

        let removed = if pred(head) {
            // A leaf head stage is the element itself.
            *head = Stage::Group(Vec::new());
            true
        } else {
            head.remove_first(&pred)
        };

        if removed && head.is_empty() {
            self.work.pop_front();
            debug!(
                queue = %self.name,
                remaining = self.work.len(),
                "head stage emptied; advancing"
            );
        }

        removed
    }
}
