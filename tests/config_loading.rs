// tests/config_loading.rs

use std::io::Write;

use dagqueue::cli::CliArgs;
use dagqueue::config::{load_and_validate, ConfigFile};
use dagqueue::errors::DagQueueError;
use dagqueue::job::{Job, Value};
use dagqueue::queue::{QueueRegistry, Stage};
use dagqueue::scheduler::Scheduler;
use dagqueue_test_utils::builders::{group, result_of, WorkloadBuilder};
use dagqueue_test_utils::init_tracing;
use tempfile::NamedTempFile;

fn workload_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn args_for(file: &NamedTempFile) -> CliArgs {
    CliArgs {
        config: file.path().to_path_buf(),
        queue: None,
        retries: 0,
        check_interval_ms: Some(10),
        log_level: None,
        dry_run: false,
    }
}

const NESTED_WORKLOAD: &str = r#"
[config]
check_interval_ms = 50
default_worker = "echo"

[queue.build]
stages = [
  [{ task = "compile", args = ["a", 1] }, "docs"],
  { task = "package", worker = "echo" },
]

[queue.docs]
stages = [{ task = "render" }, { task = "publish" }]
"#;

#[test]
fn loads_nested_workload_from_disk() {
    let file = workload_file(NESTED_WORKLOAD);
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.check_interval_ms, 50);
    assert_eq!(cfg.config.default_worker.as_deref(), Some("echo"));
    assert_eq!(cfg.root_queues(), vec!["build".to_string()]);

    let build = &cfg.queue["build"];
    assert_eq!(build.nested_queues(), vec!["docs".to_string()]);
    assert_eq!(
        build.stages[0],
        Stage::group([
            Stage::job(Job::new("compile").arg("a").arg(1)),
            Stage::nested("docs"),
        ])
    );
    assert_eq!(
        build.stages[1],
        Stage::job(Job::new("package").with_worker("echo"))
    );
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Dagqueue.toml"));
    assert!(matches!(result, Err(DagQueueError::IoError(_))));
}

#[test]
fn malformed_toml_is_toml_error() {
    let file = workload_file("[queue.a]\nstages = [ { task = \"x\" ");
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(DagQueueError::TomlError(_))));
}

#[test]
fn unknown_job_field_is_rejected() {
    let file = workload_file(
        r#"
[queue.a]
stages = [{ task = "x", worker = "echo", retries = 3 }]
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagQueueError::TomlError(_))
    ));
}

#[test]
fn unknown_nested_queue_returns_config_error() {
    let file = workload_file(
        r#"
[config]
default_worker = "echo"

[queue.a]
stages = [{ task = "x" }, "ghost"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagQueueError::ConfigError(msg)) => {
            assert!(msg.contains("unknown queue"));
            assert!(msg.contains("ghost"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn delegation_cycle_returns_structured_error() {
    let file = workload_file(
        r#"
[config]
default_worker = "echo"

[queue.a]
stages = [{ task = "x" }, "b"]

[queue.b]
stages = [{ task = "y" }, "a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagQueueError::DelegationCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('a') || msg.contains('b'));
        }
        Err(e) => panic!("Expected DelegationCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn builder_produces_runnable_config() {
    let cfg: ConfigFile = WorkloadBuilder::new()
        .check_interval_ms(5)
        .default_worker("echo")
        .with_queue("outer", vec![group(&["a"]), Stage::nested("inner")])
        .with_queue("inner", vec![group(&["b"])])
        .build();

    assert_eq!(cfg.root_queues(), vec!["outer".to_string()]);
    assert_eq!(cfg.worker_registry().default_name(), Some("echo"));
    assert_eq!(cfg.check_interval().as_millis(), 5);
}

#[tokio::test]
async fn echo_workload_runs_to_completion() {
    init_tracing();
    let file = workload_file(NESTED_WORKLOAD);
    let cfg = load_and_validate(file.path()).unwrap();

    let queues = QueueRegistry::new();
    for (name, qc) in cfg.queue.iter() {
        queues.start_queue(name.clone(), qc.stages.clone()).unwrap();
    }
    let scheduler = Scheduler::new(queues.clone(), cfg.worker_registry(), cfg.scheduler_options());

    let outcome = scheduler.run_all("build").await.unwrap();
    assert!(outcome.is_finished());

    let done = queues.completed("build").await.unwrap();
    assert_eq!(done.len(), 4);
    assert_eq!(
        result_of(&done, "compile"),
        Some(Value::List(vec![
            Value::from("compile"),
            Value::from("a"),
            Value::Int(1)
        ]))
    );
    assert_eq!(
        result_of(&done, "publish"),
        Some(Value::List(vec![Value::from("publish")]))
    );
}

#[tokio::test]
async fn run_entry_point_succeeds_for_echo_workload() {
    init_tracing();
    let file = workload_file(NESTED_WORKLOAD);
    dagqueue::run(args_for(&file)).await.unwrap();
}

#[tokio::test]
async fn dry_run_does_not_execute() {
    init_tracing();
    // The shell worker would fail this job if it ran.
    let file = workload_file(
        r#"
[queue.a]
stages = [{ task = "exit 3", worker = "shell" }]
"#,
    );
    let mut args = args_for(&file);
    args.dry_run = true;
    dagqueue::run(args).await.unwrap();
}

#[tokio::test]
async fn run_rejects_unknown_queue_selection() {
    init_tracing();
    let file = workload_file(NESTED_WORKLOAD);
    let mut args = args_for(&file);
    args.queue = Some("nope".to_string());

    let err = dagqueue::run(args).await.unwrap_err();
    assert!(err.to_string().contains("unknown queue"));
}

#[tokio::test]
async fn run_rejects_zero_check_interval_override() {
    init_tracing();
    let file = workload_file(NESTED_WORKLOAD);
    let mut args = args_for(&file);
    args.check_interval_ms = Some(0);

    assert!(dagqueue::run(args).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn run_reports_incomplete_queues_as_error() {
    init_tracing();
    let file = workload_file(
        r#"
[config]
default_worker = "shell"

[queue.fine]
stages = [{ task = "true" }]

[queue.broken]
stages = [[{ task = "true" }, { task = "exit 7" }], { task = "echo never" }]
"#,
    );
    let mut args = args_for(&file);
    args.retries = 1;

    let err = dagqueue::run(args).await.unwrap_err();
    assert!(err.to_string().contains("broken"));
    assert!(!err.to_string().contains("fine"));
}
