// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `dagqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagqueue",
    version,
    about = "Run staged job queues, one stage at a time, with safe retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workload file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run only this root queue instead of every root queue.
    #[arg(long, value_name = "NAME")]
    pub queue: Option<String>,

    /// How many times to re-run a queue whose last stage had failures.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: usize,

    /// Override `[config].check_interval_ms`.
    #[arg(long, value_name = "MS")]
    pub check_interval_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the workload, but don't run any jobs.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_workload_file_in_cwd() {
        let args = CliArgs::try_parse_from(["dagqueue"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.retries, 0);
        assert!(args.queue.is_none());
    }

    #[test]
    fn parses_run_flags() {
        let args = CliArgs::try_parse_from([
            "dagqueue",
            "--config",
            "work.toml",
            "--queue",
            "build",
            "--retries",
            "2",
            "--check-interval-ms",
            "25",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("work.toml"));
        assert_eq!(args.queue.as_deref(), Some("build"));
        assert_eq!(args.retries, 2);
        assert_eq!(args.check_interval_ms, Some(25));
        assert!(args.dry_run);
    }
}
