use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::anyhow;
use dagqueue::job::{Job, Value};
use dagqueue::queue::QueueRegistry;
use dagqueue::scheduler::{Scheduler, SchedulerOptions};
use dagqueue::worker::{WorkFuture, Worker, WorkerRegistry};

/// Name the scripted worker is registered under by [`scripted_scheduler`].
pub const SCRIPTED: &str = "scripted";

/// A scheduler over a fresh queue registry whose only worker (and default
/// worker) is `worker`.
pub fn scripted_scheduler(worker: &ScriptedWorker, check_interval: Duration) -> Scheduler {
    let mut workers = WorkerRegistry::new();
    workers.register(SCRIPTED, worker.clone());
    workers.set_default(SCRIPTED);
    Scheduler::new(
        QueueRegistry::new(),
        workers,
        SchedulerOptions { check_interval },
    )
}

/// Lifecycle event recorded by [`ScriptedWorker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct Script {
    calls: Vec<Job>,
    events: Vec<WorkEvent>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    /// Remaining scripted failures per task.
    flaky: HashMap<String, usize>,
    active: usize,
    max_active: usize,
}

/// A fake worker that:
/// - records every job it is asked to perform, plus start/finish events
/// - succeeds with `"done:<task>"` unless told otherwise
/// - can be scripted per task to fail, panic, or sleep first.
///
/// Clones share the same script, so a test can keep one clone and register
/// another.
#[derive(Clone, Default)]
pub struct ScriptedWorker {
    script: Arc<Mutex<Script>>,
}

impl ScriptedWorker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Make `task` return an error until [`heal`](Self::heal) is called.
    pub fn fail(&self, task: &str) -> &Self {
        self.lock().failing.insert(task.to_string());
        self
    }

    /// Make `task` panic until [`heal`](Self::heal) is called.
    pub fn panic_on(&self, task: &str) -> &Self {
        self.lock().panicking.insert(task.to_string());
        self
    }

    /// Make `task` fail on its next `times` calls, then succeed.
    pub fn fail_times(&self, task: &str, times: usize) -> &Self {
        self.lock().flaky.insert(task.to_string(), times);
        self
    }

    pub fn heal(&self, task: &str) -> &Self {
        let mut script = self.lock();
        script.failing.remove(task);
        script.panicking.remove(task);
        script.flaky.remove(task);
        self
    }

    pub fn delay(&self, task: &str, delay: Duration) -> &Self {
        self.lock().delays.insert(task.to_string(), delay);
        self
    }

    /// Every job performed so far, in dispatch order.
    pub fn calls(&self) -> Vec<Job> {
        self.lock().calls.clone()
    }

    /// Task names performed so far, in dispatch order.
    pub fn dispatched(&self) -> Vec<String> {
        self.lock().calls.iter().map(|j| j.task.to_string()).collect()
    }

    pub fn call_count(&self, task: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|j| j.task.as_str() == Some(task))
            .count()
    }

    pub fn events(&self) -> Vec<WorkEvent> {
        self.lock().events.clone()
    }

    /// Highest number of jobs that were running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.lock().max_active
    }

    pub fn clear(&self) {
        let mut script = self.lock();
        script.calls.clear();
        script.events.clear();
        script.max_active = 0;
    }
}

impl Worker for ScriptedWorker {
    fn perform(&self, job: Job) -> WorkFuture<'_> {
        Box::pin(async move {
            let task = job.task.to_string();

            let delay = {
                let mut script = self.lock();
                script.calls.push(job.clone());
                script.events.push(WorkEvent::Started(task.clone()));
                script.active += 1;
                script.max_active = script.max_active.max(script.active);
                script.delays.get(&task).copied()
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let (fail, panic) = {
                let mut script = self.lock();
                script.active -= 1;
                script.events.push(WorkEvent::Finished(task.clone()));
                let flaky = match script.flaky.get_mut(&task) {
                    Some(remaining) if *remaining > 0 => {
                        *remaining -= 1;
                        true
                    }
                    _ => false,
                };
                (
                    flaky || script.failing.contains(&task),
                    script.panicking.contains(&task),
                )
            };

            if panic {
                panic!("scripted panic for task {task}");
            }
            if fail {
                return Err(anyhow!("scripted failure for task {task}"));
            }

            Ok(Value::Str(format!("done:{task}")))
        })
    }
}
