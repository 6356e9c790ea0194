// src/config/mod.rs

//! Workload configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workload file from disk (`loader.rs`).
//! - Validate queue references, workers and global settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigFile, ConfigSection, QueueConfig, RawConfigFile};
