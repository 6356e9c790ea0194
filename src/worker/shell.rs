// src/worker/shell.rs

//! Worker that runs a job's task as a shell command.

use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::job::{Job, Value};

use super::{WorkFuture, Worker};

/// Runs `task` through the platform shell.
///
/// Job args are passed as positional parameters (`$1`, `$2`, ... on Unix).
/// A zero exit status is a normal completion whose result is the trimmed
/// stdout; anything else is an abnormal termination.
#[derive(Debug, Clone, Default)]
pub struct ShellWorker {
    _private: (),
}

impl ShellWorker {
    pub const NAME: &'static str = "shell";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Worker for ShellWorker {
    fn perform(&self, job: Job) -> WorkFuture<'_> {
        Box::pin(run_shell(job))
    }
}

async fn run_shell(job: Job) -> Result<Value> {
    let script = job
        .task
        .as_str()
        .ok_or_else(|| anyhow!("shell worker needs a string task, got '{}'", job.task))?
        .to_string();

    info!(job = %job, queue = ?job.queue, "starting shell job");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&script).arg("dagqueue");
        c
    };

    for arg in &job.args {
        cmd.arg(arg.to_string());
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{job}'"))?;

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let label = job.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(job = %label, "stderr: {}", line);
            }
        });
    }

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout)
            .await
            .with_context(|| format!("reading stdout of job '{job}'"))?;
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of job '{job}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(job = %job, exit_code = code, success = status.success(), "shell job exited");

    if !status.success() {
        bail!("job '{job}' exited with status {code}");
    }

    Ok(Value::Str(stdout.trim_end().to_string()))
}
