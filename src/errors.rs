// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagQueueError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Queue already started: {0}")]
    QueueExists(String),

    #[error("No worker available for task {task}: {reason}")]
    NoWorker { task: String, reason: String },

    #[error("Cycle detected in queue delegation: {0}")]
    DelegationCycle(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagQueueError>;
