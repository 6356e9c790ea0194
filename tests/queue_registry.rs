// tests/queue_registry.rs

use std::error::Error;

use dagqueue::errors::DagQueueError;
use dagqueue::job::{Job, Value};
use dagqueue::queue::{QueueRegistry, Stage};
use dagqueue_test_utils::builders::{group, job, sorted_task_names, task_names};
use dagqueue_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn current_stage_tags_jobs_with_owning_queue() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![group(&["A", "B"]), Stage::job(job("C"))])?;

    let stage = registry.current_stage("q").await?;
    assert_eq!(task_names(&stage), vec!["A", "B"]);
    assert!(stage.iter().all(|j| j.queue.as_deref() == Some("q")));
    assert!(stage.iter().all(|j| j.result.is_none()));

    Ok(())
}

#[tokio::test]
async fn finish_job_matches_by_identity_not_result() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    let j1 = Job::new("x").arg(1);
    registry.start_queue("q", vec![Stage::jobs([j1.clone(), job("y")])])?;

    // Same task/worker/args, different result: still the same job.
    let j2 = Job::new("x").arg(1).with_result(Value::Int(42));
    registry.finish_job("q", j2, Value::Int(42)).await?;

    let stage = registry.current_stage("q").await?;
    assert_eq!(task_names(&stage), vec!["y"]);

    let done = registry.completed("q").await?;
    assert_eq!(done.len(), 1);
    let finished = done.iter().next().unwrap();
    assert!(finished.same_job(&j1));
    assert_eq!(finished.result, Some(Value::Int(42)));

    Ok(())
}

#[tokio::test]
async fn finishing_every_job_advances_to_next_stage() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![group(&["A", "B"]), group(&["C"])])?;

    for j in registry.current_stage("q").await? {
        registry.finish_job("q", j, Value::Null).await?;
    }
    assert_eq!(task_names(&registry.current_stage("q").await?), vec!["C"]);

    registry.finish_job("q", job("C"), Value::Null).await?;
    assert!(registry.current_stage("q").await?.is_empty());
    assert_eq!(sorted_task_names(&registry.completed("q").await?), vec!["A", "B", "C"]);

    Ok(())
}

#[tokio::test]
async fn complete_stage_pops_head_and_records_jobs() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![group(&["A", "B"]), Stage::job(job("C"))])?;

    registry.complete_stage("q").await?;
    assert_eq!(task_names(&registry.current_stage("q").await?), vec!["C"]);
    assert_eq!(sorted_task_names(&registry.completed("q").await?), vec!["A", "B"]);

    registry.complete_stage("q").await?;
    // Popping a drained queue is a no-op.
    registry.complete_stage("q").await?;
    assert!(registry.current_stage("q").await?.is_empty());

    Ok(())
}

/// Head stage `[outer_job, "inner"]` with `inner = [a, b]`.
#[tokio::test]
async fn nested_queue_is_flattened_and_torn_down() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("inner", vec![Stage::job(job("a")), Stage::job(job("b"))])?;
    registry.start_queue(
        "outer",
        vec![Stage::group([Stage::job(job("outer_job")), Stage::nested("inner")])],
    )?;

    let stage = registry.current_stage("outer").await?;
    assert_eq!(task_names(&stage), vec!["outer_job", "a"]);
    assert_eq!(stage[0].queue.as_deref(), Some("outer"));
    assert_eq!(stage[1].queue.as_deref(), Some("inner"));

    registry.finish_job("outer", job("a"), Value::from("ra")).await?;
    assert_eq!(
        task_names(&registry.current_stage("outer").await?),
        vec!["outer_job", "b"]
    );
    assert!(registry.contains("inner"));

    registry.finish_job("outer", job("outer_job"), Value::Null).await?;
    assert_eq!(task_names(&registry.current_stage("outer").await?), vec!["b"]);

    registry.finish_job("outer", job("b"), Value::from("rb")).await?;
    assert!(!registry.contains("inner"));
    assert!(registry.current_stage("outer").await?.is_empty());

    let done = registry.completed("outer").await?;
    assert_eq!(sorted_task_names(&done), vec!["a", "b", "outer_job"]);

    Ok(())
}

#[tokio::test]
async fn shutdown_makes_queue_unreachable() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    let handle = registry.start_queue("q", vec![group(&["A"])])?;

    registry.shutdown("q").await?;

    assert!(matches!(
        registry.current_stage("q").await,
        Err(DagQueueError::QueueNotFound(name)) if name == "q"
    ));
    assert!(matches!(
        handle.current_stage().await,
        Err(DagQueueError::QueueNotFound(_))
    ));
    assert!(matches!(
        registry.shutdown("q").await,
        Err(DagQueueError::QueueNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn shutdown_stops_referenced_nested_queues() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("inner", vec![group(&["a"])])?;
    registry.start_queue("outer", vec![group(&["x"]), Stage::nested("inner")])?;

    registry.stop_queue("outer").await?;

    assert!(registry.names().is_empty());
    Ok(())
}

#[tokio::test]
async fn starting_a_registered_name_fails() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![])?;

    assert!(matches!(
        registry.start_queue("q", vec![]),
        Err(DagQueueError::QueueExists(name)) if name == "q"
    ));

    // Once stopped, the name can be reused.
    registry.stop_queue("q").await?;
    registry.start_queue("q", vec![])?;
    Ok(())
}

#[tokio::test]
async fn missing_nested_queue_is_reported() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("outer", vec![Stage::nested("ghost")])?;

    assert!(matches!(
        registry.current_stage("outer").await,
        Err(DagQueueError::QueueNotFound(name)) if name == "ghost"
    ));
    Ok(())
}

#[tokio::test]
async fn completed_never_shrinks() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![group(&["A", "B"]), group(&["C"])])?;

    let mut previous = registry.completed("q").await?;
    for task in ["A", "A", "B", "C"] {
        registry.finish_job("q", job(task), Value::from(task)).await?;
        let now = registry.completed("q").await?;
        assert!(now.is_superset(&previous));
        previous = now;
    }

    Ok(())
}

#[tokio::test]
async fn empty_nested_queue_is_skipped_and_torn_down() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("inner", vec![])?;
    registry.start_queue("outer", vec![Stage::nested("inner"), group(&["C"])])?;

    let stage = registry.current_stage("outer").await?;
    assert_eq!(task_names(&stage), vec!["C"]);
    assert!(!registry.contains("inner"));

    Ok(())
}

#[tokio::test]
async fn drained_nested_ref_is_dropped_but_sibling_jobs_stay() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("inner", vec![group(&["p"])])?;
    registry.start_queue(
        "outer",
        vec![
            Stage::group([Stage::job(job("x")), Stage::nested("inner")]),
            group(&["y"]),
        ],
    )?;

    // Drain the inner queue behind the outer queue's back.
    registry.finish_job("inner", job("p"), Value::Null).await?;

    assert_eq!(task_names(&registry.current_stage("outer").await?), vec!["x"]);
    assert!(!registry.contains("inner"));

    registry.finish_job("outer", job("x"), Value::Null).await?;
    assert_eq!(task_names(&registry.current_stage("outer").await?), vec!["y"]);

    Ok(())
}

#[tokio::test]
async fn finishing_a_job_from_a_later_stage_is_ignored() -> TestResult {
    init_tracing();
    let registry = QueueRegistry::new();
    registry.start_queue("q", vec![group(&["A"]), group(&["C"])])?;

    registry.finish_job("q", job("C"), Value::from("early")).await?;

    assert!(registry.completed("q").await?.is_empty());
    assert_eq!(task_names(&registry.current_stage("q").await?), vec!["A"]);

    registry.finish_job("q", job("A"), Value::Null).await?;
    assert_eq!(task_names(&registry.current_stage("q").await?), vec!["C"]);

    Ok(())
}
