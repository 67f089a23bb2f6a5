//! Bounded work queue connecting submission to the worker pool.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Semaphore};

use crate::error::SpindleError;
use crate::task::TaskId;

/// Bounded FIFO of task ids awaiting execution.
///
/// Design:
/// - Ids only. The registry record, re-read when the attempt starts, is
///   the authority for state; a queued entry is just a scheduling hint.
/// - `push` waits for free capacity. This is the system's only
///   backpressure: submitters slow down instead of memory growing.
/// - `close` fails pending and future pushes and wakes every blocked
///   `pop` with `None`. Undelivered entries are dropped, since workers
///   take no new work during shutdown.
#[derive(Debug)]
pub struct WorkQueue {
    items: Mutex<VecDeque<TaskId>>,

    /// Free capacity; acquired by `push`, released by `pop`.
    space: Semaphore,

    /// Queued items; released by `push`, acquired by `pop`.
    ready: Semaphore,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            space: Semaphore::new(capacity),
            ready: Semaphore::new(0),
        }
    }

    /// Enqueue an id, waiting while the queue is full.
    pub async fn push(&self, id: TaskId) -> Result<(), SpindleError> {
        let permit = self
            .space
            .acquire()
            .await
            .map_err(|_| SpindleError::QueueClosed)?;
        permit.forget();

        self.items.lock().await.push_back(id);
        self.ready.add_permits(1);
        Ok(())
    }

    /// Dequeue the oldest id, waiting until one is available. Returns
    /// `None` once the queue is closed.
    pub async fn pop(&self) -> Option<TaskId> {
        let permit = self.ready.acquire().await.ok()?;
        permit.forget();

        // A ready permit guarantees a queued item.
        let id = self.items.lock().await.pop_front()?;
        self.space.add_permits(1);
        Some(id)
    }

    /// Close the queue for shutdown.
    pub fn close(&self) {
        self.space.close();
        self.ready.close();
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let queue = WorkQueue::new(8);
        let a = TaskId::generate();
        let b = TaskId::generate();
        let c = TaskId::generate();

        for id in [a, b, c] {
            queue.push(id).await.unwrap();
        }

        assert_eq!(queue.pop().await, Some(a));
        assert_eq!(queue.pop().await, Some(b));
        assert_eq!(queue.pop().await, Some(c));
    }

    #[tokio::test]
    async fn push_blocks_when_full() {
        let queue = WorkQueue::new(1);
        queue.push(TaskId::generate()).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), queue.push(TaskId::generate())).await;
        assert!(blocked.is_err(), "push into a full queue must block");
    }

    #[tokio::test]
    async fn pop_frees_capacity_for_a_blocked_push() {
        let queue = WorkQueue::new(1);
        let first = TaskId::generate();
        queue.push(first).await.unwrap();

        let popped = queue.pop().await;
        assert_eq!(popped, Some(first));

        // Capacity is back; this push completes immediately.
        tokio::time::timeout(Duration::from_millis(50), queue.push(TaskId::generate()))
            .await
            .expect("push must not block after a pop")
            .unwrap();
    }

    #[tokio::test]
    async fn close_fails_push_and_wakes_pop() {
        let queue = std::sync::Arc::new(WorkQueue::new(4));

        let waiting = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        queue.close();

        assert_eq!(waiting.await.unwrap(), None);
        let err = queue.push(TaskId::generate()).await.unwrap_err();
        assert!(matches!(err, SpindleError::QueueClosed));
    }
}
