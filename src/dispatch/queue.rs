// src/dispatch/queue.rs

//! The single shared pending queue that feeds every executor.
//!
//! Entries are ordered by ascending priority value (1 is most urgent) and
//! FIFO within a priority level. Producers are the dispatcher, the pool's
//! typed `submit_*` helpers and the issue detector; the sole steady-state
//! consumer is the pool's dispatch loop, which parks on [`TaskQueue::next_task`]
//! instead of polling.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tracing::debug;

use crate::task::Task;

/// Heap entry: priority plus a monotonically increasing submission sequence
/// number for FIFO tie-breaking.
#[derive(Debug)]
struct QueueEntry {
    priority: u8,
    seq: u64,
    task: Task,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the numerically smallest
        // priority pops first, earliest submission winning ties.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct QueueState {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
    closed: bool,
}

/// Priority-ordered pending queue with notify-based wakeup.
#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, QueueState> {
        // Recover the inner state if a producer panicked mid-push; the heap
        // itself is never left half-mutated by our operations.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Push a task. Returns `false` if the queue has been closed.
    pub fn push(&self, task: Task) -> bool {
        {
            let mut state = self.locked();
            if state.closed {
                return false;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            debug!(task = %task.id, priority = task.priority, seq, "queued task");
            state.heap.push(QueueEntry {
                priority: task.priority,
                seq,
                task,
            });
        }
        self.notify.notify_one();
        true
    }

    /// Non-blocking pop of the most urgent pending task.
    pub fn pop(&self) -> Option<Task> {
        self.locked().heap.pop().map(|e| e.task)
    }

    /// Wait until a task is available and pop it.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn next_task(&self) -> Option<Task> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.locked();
                if let Some(entry) = state.heap.pop() {
                    return Some(entry.task);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.locked().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().heap.is_empty()
    }

    /// Close the queue: further pushes are refused and waiting consumers
    /// wake up to drain what is left.
    pub fn close(&self) {
        self.locked().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.locked().closed
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;

    fn task(priority: u8) -> Task {
        Task::new(TaskType::Custom, priority)
    }

    #[test]
    fn pop_returns_lowest_priority_value_first() {
        let queue = TaskQueue::new();
        queue.push(task(5));
        queue.push(task(1));
        queue.push(task(8));

        assert_eq!(queue.pop().map(|t| t.priority), Some(1));
        assert_eq!(queue.pop().map(|t| t.priority), Some(5));
        assert_eq!(queue.pop().map(|t| t.priority), Some(8));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn equal_priorities_resolve_fifo() {
        let queue = TaskQueue::new();
        let first = task(5);
        let second = task(5);
        let first_id = first.id.clone();
        let second_id = second.id.clone();
        queue.push(first);
        queue.push(second);

        assert_eq!(queue.pop().map(|t| t.id), Some(first_id));
        assert_eq!(queue.pop().map(|t| t.id), Some(second_id));
    }

    #[test]
    fn closed_queue_refuses_pushes_but_drains() {
        let queue = TaskQueue::new();
        queue.push(task(3));
        queue.close();

        assert!(!queue.push(task(1)));
        assert_eq!(queue.pop().map(|t| t.priority), Some(3));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn next_task_wakes_on_push() {
        use std::sync::Arc;

        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next_task().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.push(task(2));

        let popped = tokio::time::timeout(std::time::Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .expect("join");
        assert_eq!(popped.map(|t| t.priority), Some(2));
    }

    #[tokio::test]
    async fn next_task_returns_none_after_close() {
        use std::sync::Arc;

        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next_task().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.close();

        let popped = tokio::time::timeout(std::time::Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .expect("join");
        assert!(popped.is_none());
    }
}
