// src/scheduler/outcome.rs

use crate::job::Job;

/// Result of driving a queue with [`Scheduler::run_all`](super::Scheduler::run_all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The queue's work list is fully drained.
    Finished,
    /// The last attempted stage did not complete. Carries the jobs that
    /// terminated abnormally; they are still pending in the queue and a later
    /// run will dispatch exactly those.
    Incomplete(Vec<Job>),
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished)
    }

    /// Jobs that failed in the last attempted stage (empty when finished).
    pub fn failed(&self) -> &[Job] {
        match self {
            RunOutcome::Finished => &[],
            RunOutcome::Incomplete(jobs) => jobs,
        }
    }
}
