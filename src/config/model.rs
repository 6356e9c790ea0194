// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::job::{Job, QueueName};
use crate::queue::Stage;
use crate::scheduler::SchedulerOptions;
use crate::worker::WorkerRegistry;

/// Workload file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// check_interval_ms = 500
/// default_worker = "shell"
///
/// [queue.build]
/// stages = [
///   [{ task = "make a" }, { task = "make b" }, "docs"],
///   { task = "make install" },
/// ]
///
/// [queue.docs]
/// stages = [{ task = "make docs" }]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global scheduler settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All queues from `[queue.<name>]`.
    #[serde(default)]
    pub queue: BTreeMap<QueueName, QueueConfig>,
}

/// A validated workload. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub queue: BTreeMap<QueueName, QueueConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Monitor poll granularity in milliseconds.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Worker used for jobs that do not name one.
    #[serde(default)]
    pub default_worker: Option<String>,
}

fn default_check_interval_ms() -> u64 {
    1000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            default_worker: None,
        }
    }
}

/// `[queue.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Ordered stage list: tables are jobs, arrays are parallel groups and
    /// strings delegate to another queue.
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl QueueConfig {
    /// Every queue this queue delegates to, across all of its stages.
    pub fn nested_queues(&self) -> Vec<QueueName> {
        self.stages.iter().flat_map(Stage::nested_queues).collect()
    }

    /// Every job owned directly by this queue.
    pub fn jobs(&self) -> Vec<Job> {
        self.stages.iter().flat_map(Stage::direct_jobs).collect()
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        queue: BTreeMap<QueueName, QueueConfig>,
    ) -> Self {
        Self { config, queue }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.config.check_interval_ms)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            check_interval: self.check_interval(),
        }
    }

    /// Built-in workers, with the configured default applied.
    pub fn worker_registry(&self) -> WorkerRegistry {
        let mut workers = WorkerRegistry::with_builtins();
        if let Some(ref name) = self.config.default_worker {
            workers.set_default(name.clone());
        }
        workers
    }

    /// Queues that no other queue delegates to. These are the ones to run;
    /// the rest are driven through their parents.
    pub fn root_queues(&self) -> Vec<QueueName> {
        let nested: Vec<QueueName> = self
            .queue
            .values()
            .flat_map(QueueConfig::nested_queues)
            .collect();

        self.queue
            .keys()
            .filter(|name| !nested.contains(name))
            .cloned()
            .collect()
    }
}
