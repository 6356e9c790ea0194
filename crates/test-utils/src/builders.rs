#![allow(dead_code)]

use std::collections::BTreeMap;

use dagqueue::config::{ConfigFile, ConfigSection, QueueConfig, RawConfigFile};
use dagqueue::job::{Job, Value};
use dagqueue::queue::Stage;

/// Shorthand for a job with a string task and no args.
pub fn job(task: &str) -> Job {
    Job::new(task)
}

/// A parallel group of plain jobs.
pub fn group(tasks: &[&str]) -> Stage {
    Stage::jobs(tasks.iter().map(|t| job(t)))
}

/// Tasks of `jobs`, as strings, in the given order.
pub fn task_names(jobs: &[Job]) -> Vec<String> {
    jobs.iter().map(|j| j.task.to_string()).collect()
}

/// Sorted task names, for order-insensitive comparisons.
pub fn sorted_task_names<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Vec<String> {
    let mut names: Vec<String> = jobs.into_iter().map(|j| j.task.to_string()).collect();
    names.sort();
    names
}

/// Result attached to `task` in a finished set, if any.
pub fn result_of<'a>(jobs: impl IntoIterator<Item = &'a Job>, task: &str) -> Option<Value> {
    jobs.into_iter()
        .find(|j| j.task.as_str() == Some(task))
        .and_then(|j| j.result.clone())
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct WorkloadBuilder {
    config: RawConfigFile,
}

impl WorkloadBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                queue: BTreeMap::new(),
            },
        }
    }

    pub fn check_interval_ms(mut self, ms: u64) -> Self {
        self.config.config.check_interval_ms = ms;
        self
    }

    pub fn default_worker(mut self, name: &str) -> Self {
        self.config.config.default_worker = Some(name.to_string());
        self
    }

    pub fn with_queue(mut self, name: &str, stages: Vec<Stage>) -> Self {
        self.config
            .queue
            .insert(name.to_string(), QueueConfig { stages });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for WorkloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}
