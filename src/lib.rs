// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod job;
pub mod logging;
pub mod queue;
pub mod scheduler;
pub mod worker;

use anyhow::{anyhow, bail, Result};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::job::QueueName;
use crate::queue::{QueueRegistry, Stage};
use crate::scheduler::{RunOutcome, Scheduler};

pub use crate::errors::{DagQueueError, Result as DagQueueResult};
pub use crate::job::{Job, Value};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workload loading
/// - queue registry (every declared queue is started)
/// - worker registry + scheduler
/// - one concurrent `run_all` per root queue, with retries
///
/// Returns an error if any root queue is left incomplete.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;

    if let Some(ms) = args.check_interval_ms {
        if ms == 0 {
            bail!("--check-interval-ms must be >= 1");
        }
        cfg.config.check_interval_ms = ms;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let roots = match args.queue {
        Some(ref name) if cfg.queue.contains_key(name) => vec![name.clone()],
        Some(ref name) => bail!("unknown queue '{name}'"),
        None => cfg.root_queues(),
    };

    let registry = QueueRegistry::new();
    run_workload(&registry, &cfg, roots, args.retries).await
}

/// Start every queue of `cfg` in `registry`, drive `roots` concurrently and
/// stop all queues afterwards, whether or not the runs succeeded.
async fn run_workload(
    registry: &QueueRegistry,
    cfg: &ConfigFile,
    roots: Vec<QueueName>,
    retries: usize,
) -> Result<()> {
    let result = drive_roots(registry, cfg, roots, retries).await;
    registry.stop_all().await;

    let mut incomplete = result?;
    if !incomplete.is_empty() {
        incomplete.sort();
        bail!("queues left incomplete: {}", incomplete.join(", "));
    }

    Ok(())
}

/// Returns the roots that ended incomplete.
async fn drive_roots(
    registry: &QueueRegistry,
    cfg: &ConfigFile,
    roots: Vec<QueueName>,
    retries: usize,
) -> Result<Vec<QueueName>> {
    for (name, qc) in cfg.queue.iter() {
        registry.start_queue(name.clone(), qc.stages.clone())?;
    }

    let scheduler = Scheduler::new(registry.clone(), cfg.worker_registry(), cfg.scheduler_options());
    info!(?roots, check_interval = ?cfg.check_interval(), "running root queues");

    let mut runs: JoinSet<(QueueName, DagQueueResult<RunOutcome>)> = JoinSet::new();
    for root in roots {
        let scheduler = scheduler.clone();
        runs.spawn(async move {
            let outcome = scheduler.run_with_retries(&root, retries).await;
            (root, outcome)
        });
    }

    let mut incomplete = Vec::new();
    while let Some(joined) = runs.join_next().await {
        let (name, outcome) = joined.map_err(|e| anyhow!("queue run task failed: {e}"))?;
        match outcome? {
            RunOutcome::Finished => {
                println!("{name}: finished");
                print_completed(registry, &name).await?;
            }
            RunOutcome::Incomplete(failed) => {
                println!("{name}: incomplete ({} failed)", failed.len());
                for job in &failed {
                    println!("  failed: {job}");
                }
                incomplete.push(name);
            }
        }
    }

    Ok(incomplete)
}

async fn print_completed(registry: &QueueRegistry, name: &str) -> Result<()> {
    let mut done: Vec<Job> = registry.completed(name).await?.into_iter().collect();
    done.sort_by(|a, b| a.to_string().cmp(&b.to_string()));

    for job in done {
        match job.result {
            Some(ref result) => println!("  {job} -> {result}"),
            None => println!("  {job}"),
        }
    }

    Ok(())
}

/// Simple dry-run output: print queues and their stages.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagqueue dry-run");
    println!("  config.check_interval_ms = {}", cfg.config.check_interval_ms);
    if let Some(ref worker) = cfg.config.default_worker {
        println!("  config.default_worker = {worker}");
    }
    println!("  roots = {:?}", cfg.root_queues());
    println!();

    println!("queues ({}):", cfg.queue.len());
    for (name, qc) in cfg.queue.iter() {
        println!("  - {name}");
        for (idx, stage) in qc.stages.iter().enumerate() {
            println!("      stage {}: {}", idx + 1, describe_stage(stage));
        }
    }

    debug!("dry-run complete (no execution)");
}

fn describe_stage(stage: &Stage) -> String {
    match stage {
        Stage::Job(job) => job.to_string(),
        Stage::Queue(name) => format!("<{name}>"),
        Stage::Group(items) => {
            let parts: Vec<String> = items.iter().map(describe_stage).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}
