// tests/decomposition_dispatch.rs

//! Dispatcher + decomposer integration: compound tasks fan out into
//! subtasks on the shared queue and drain through the pool in order.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskmend::config::{DecomposerSection, PoolSection};
use taskmend::decompose::TaskDecomposer;
use taskmend::dispatch::{PriorityDispatcher, TaskQueue};
use taskmend::pool::{ExecutorPool, HandlerRegistry};
use taskmend::task::{Task, TaskType};
use taskmend_test_utils::builders::TaskBuilder;
use taskmend_test_utils::fake_handlers::RecordingHandler;
use taskmend_test_utils::{init_tracing, wait_until};

fn dispatcher_with_decomposer() -> (PriorityDispatcher, Arc<TaskQueue>) {
    let queue = Arc::new(TaskQueue::new());
    let decomposer = Arc::new(TaskDecomposer::new(DecomposerSection::default()));
    let dispatcher = PriorityDispatcher::new(Arc::clone(&queue), Some(decomposer));
    (dispatcher, queue)
}

#[test]
fn simple_task_passes_through_unchanged() {
    init_tracing();

    let (dispatcher, queue) = dispatcher_with_decomposer();
    let task = TaskBuilder::new(TaskType::Fix)
        .id("plain")
        .description("restart the cache")
        .build();

    let id = dispatcher.dispatch(task).unwrap();
    assert_eq!(id, "plain");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop().map(|t| t.id), Some("plain".to_string()));
}

#[test]
fn compound_task_fans_out_into_subtasks() {
    init_tracing();

    let (dispatcher, queue) = dispatcher_with_decomposer();
    let task = TaskBuilder::new(TaskType::Custom)
        .id("compound")
        .description("analyze the index then fix the index and verify the fix")
        .build();

    let id = dispatcher.dispatch(task).unwrap();
    assert_eq!(id, "decomposed:compound");
    assert_eq!(queue.len(), 3);

    // Every queued subtask carries its ancestry.
    let mut parents = Vec::new();
    while let Some(sub) = queue.pop() {
        assert!(sub.id.starts_with("compound-sub-"));
        parents.push(
            sub.metadata
                .get("parent_task_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        );
    }
    assert!(parents
        .iter()
        .all(|p| p.as_deref() == Some("compound")));
}

#[test]
fn get_next_task_orders_by_priority_then_fifo() {
    init_tracing();

    let (dispatcher, _queue) = dispatcher_with_decomposer();
    dispatcher
        .dispatch(
            TaskBuilder::new(TaskType::Fix)
                .id("urgent")
                .priority(1)
                .description("broken login")
                .build(),
        )
        .unwrap();
    dispatcher
        .dispatch(
            TaskBuilder::new(TaskType::Analyze)
                .id("casual")
                .priority(5)
                .description("weekly report")
                .build(),
        )
        .unwrap();

    assert_eq!(
        dispatcher.get_next_task().map(|t| t.id),
        Some("urgent".to_string())
    );
    assert_eq!(
        dispatcher.get_next_task().map(|t| t.id),
        Some("casual".to_string())
    );
    assert!(dispatcher.get_next_task().is_none());
}

#[tokio::test]
async fn decomposed_subtasks_drain_in_dependency_order() {
    init_tracing();

    let queue = Arc::new(TaskQueue::new());
    let decomposer = Arc::new(TaskDecomposer::new(DecomposerSection::default()));
    let dispatcher = PriorityDispatcher::new(Arc::clone(&queue), Some(decomposer));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut handlers = HandlerRegistry::new();
    for ty in [TaskType::Analyze, TaskType::Fix, TaskType::Custom] {
        handlers.register(ty, Arc::new(RecordingHandler::new(Arc::clone(&seen))));
    }

    let cfg = PoolSection {
        size: 1,
        max_retries: 3,
        result_history: 100,
    };
    let pool = Arc::new(ExecutorPool::new(cfg, Arc::clone(&queue), handlers));
    pool.start();

    let task = Task::new(TaskType::Custom, 5)
        .with_description("analyze the ledger then fix the ledger");
    let parent_id = task.id.clone();
    dispatcher.dispatch(task).unwrap();

    let done_pool = Arc::clone(&pool);
    wait_until(
        || done_pool.metrics().completed == 2,
        Duration::from_secs(5),
    )
    .await;

    let order = seen.lock().unwrap().clone();
    assert_eq!(order.len(), 2);
    // The analyze clause is sub-1 and carries the higher priority, so with a
    // single executor it runs before the dependent fix clause.
    assert_eq!(order[0], format!("{parent_id}-sub-1"));
    assert_eq!(order[1], format!("{parent_id}-sub-2"));

    pool.shutdown();
}
