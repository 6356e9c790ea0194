// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagQueueError, Result};
use crate::worker::WorkerRegistry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagQueueError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.queue))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_queues(cfg)?;
    validate_global_config(cfg)?;
    validate_workers(cfg)?;
    validate_references(cfg)?;
    validate_delegation_dag(cfg)?;
    Ok(())
}

fn ensure_has_queues(cfg: &RawConfigFile) -> Result<()> {
    if cfg.queue.is_empty() {
        return Err(DagQueueError::ConfigError(
            "config must contain at least one [queue.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.check_interval_ms == 0 {
        return Err(DagQueueError::ConfigError(
            "[config].check_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref name) = cfg.config.default_worker {
        ensure_known_worker(name, "[config].default_worker")?;
    }

    Ok(())
}

fn validate_workers(cfg: &RawConfigFile) -> Result<()> {
    let has_default = cfg.config.default_worker.is_some();

    for (queue, qc) in cfg.queue.iter() {
        for job in qc.jobs() {
            match job.worker {
                Some(ref name) => {
                    ensure_known_worker(name, &format!("job '{}' in queue '{}'", job, queue))?
                }
                None if !has_default => {
                    return Err(DagQueueError::ConfigError(format!(
                        "job '{}' in queue '{}' names no worker and [config].default_worker is not set",
                        job, queue
                    )));
                }
                None => {}
            }
        }
    }

    Ok(())
}

fn ensure_known_worker(name: &str, context: &str) -> Result<()> {
    if WorkerRegistry::builtin_names().contains(&name) {
        Ok(())
    } else {
        Err(DagQueueError::ConfigError(format!(
            "{context} uses unknown worker '{name}' (expected one of {:?})",
            WorkerRegistry::builtin_names()
        )))
    }
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    // nested queue -> parent that delegates to it
    let mut parents: BTreeMap<&str, &str> = BTreeMap::new();

    for (name, qc) in cfg.queue.iter() {
        for nested in qc.stages.iter().flat_map(|s| s.nested_queues()) {
            let Some((nested_name, _)) = cfg.queue.get_key_value(&nested) else {
                return Err(DagQueueError::ConfigError(format!(
                    "queue '{}' references unknown queue '{}'",
                    name, nested
                )));
            };
            if nested == *name {
                return Err(DagQueueError::ConfigError(format!(
                    "queue '{}' cannot delegate to itself",
                    name
                )));
            }
            if let Some(previous) = parents.insert(nested_name.as_str(), name.as_str()) {
                if previous != name.as_str() {
                    return Err(DagQueueError::ConfigError(format!(
                        "queue '{}' is referenced by both '{}' and '{}'; nested queues must have a single parent",
                        nested, previous, name
                    )));
                }
            }
        }
    }

    Ok(())
}

fn validate_delegation_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: parent -> nested.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.queue.keys() {
        graph.add_node(name.as_str());
    }

    for (name, qc) in cfg.queue.iter() {
        for nested in qc.nested_queues() {
            if let Some((nested_name, _)) = cfg.queue.get_key_value(&nested) {
                graph.add_edge(name.as_str(), nested_name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagQueueError::DelegationCycle(format!(
            "cycle detected in queue delegation involving queue '{}'",
            cycle.node_id()
        ))),
    }
}
