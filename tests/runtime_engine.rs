// tests/runtime_engine.rs

//! End-to-end engine behaviour: submit → execute → observe, plus the
//! issue-to-remediation path.

use std::sync::Arc;
use std::time::Duration;

use taskmend::health::{DetectedIssue, IssueCategory, IssueSeverity};
use taskmend::pool::HandlerRegistry;
use taskmend::task::TaskType;
use taskmend::{Engine, EngineError};
use taskmend_test_utils::builders::EngineConfigBuilder;
use taskmend_test_utils::fake_handlers::OkHandler;
use taskmend_test_utils::{init_tracing, wait_until};

fn full_registry() -> HandlerRegistry {
    let mut handlers = HandlerRegistry::new();
    for ty in [
        TaskType::Fix,
        TaskType::Code,
        TaskType::Analyze,
        TaskType::Repair,
        TaskType::Optimize,
        TaskType::Monitor,
        TaskType::Heal,
        TaskType::Custom,
    ] {
        handlers.register(ty, Arc::new(OkHandler));
    }
    handlers
}

#[tokio::test]
async fn dispatched_tasks_execute_and_report() {
    init_tracing();

    let engine = Engine::new(EngineConfigBuilder::new().build(), full_registry());
    engine.start();

    engine.dispatcher().dispatch_fix("patch the gateway").unwrap();
    engine
        .dispatcher()
        .dispatch_analyze("trace the latency")
        .unwrap();

    let pool = engine.pool();
    wait_until(|| pool.metrics().completed == 2, Duration::from_secs(5)).await;

    let metrics = pool.metrics();
    assert_eq!(metrics.completed, 2);
    assert_eq!(metrics.failed, 0);
    assert_eq!(metrics.active + metrics.idle, metrics.total);
    assert!(metrics.avg_exec_ms >= 0.0);

    let status = engine.dispatcher().status();
    assert_eq!(status.history_size, 2);

    engine.shutdown();
}

#[tokio::test]
async fn detected_issue_turns_into_a_heal_task() {
    init_tracing();

    let engine = Engine::new(EngineConfigBuilder::new().build(), full_registry());
    engine.start();

    // A high-severity memory issue, as the resource scan would emit at 95%.
    let issue = DetectedIssue::new(
        IssueCategory::System,
        IssueSeverity::High,
        "memory_high",
        "system",
        "memory usage at 95.0%",
    );
    engine.detector().process_issue(issue);

    let pool = engine.pool();
    wait_until(|| pool.metrics().completed == 1, Duration::from_secs(5)).await;

    // Exactly one downstream task, of heal type at severity-derived priority.
    let results = pool.recent_results(10);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].task_type, TaskType::Heal);

    let issues = engine.detector().recent_issues(10);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].auto_fix_attempted);

    engine.shutdown();
}

#[tokio::test]
async fn compound_dispatch_runs_every_subtask() {
    init_tracing();

    let engine = Engine::new(EngineConfigBuilder::new().build(), full_registry());
    engine.start();

    let id = engine
        .dispatcher()
        .dispatch(
            taskmend::Task::new(TaskType::Custom, 5)
                .with_description("inspect the queue and inspect the cache then patch the cache"),
        )
        .unwrap();
    assert!(id.starts_with("decomposed:"));

    let pool = engine.pool();
    wait_until(|| pool.metrics().completed == 3, Duration::from_secs(5)).await;

    engine.shutdown();
}

#[tokio::test]
async fn shutdown_refuses_new_work() {
    init_tracing();

    let engine = Engine::new(EngineConfigBuilder::new().build(), full_registry());
    engine.start();
    engine.shutdown();

    let err = engine.dispatcher().dispatch_fix("too late").unwrap_err();
    assert!(matches!(err, EngineError::QueueClosed));
}
