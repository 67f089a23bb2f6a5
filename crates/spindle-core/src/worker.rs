//! Worker pool: a fixed set of execution loops draining the work queue.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::queue::WorkQueue;
use crate::registry::TaskRegistry;
use crate::retry::AttemptPolicy;
use crate::task::TaskId;
use crate::workload::Workload;

/// Handle over the pool of worker loops.
/// - `request_shutdown` stops new work from being taken.
/// - `shutdown_and_join` additionally waits for in-flight attempts.
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` worker loops. They run until shutdown; a task-level
    /// failure never ends a loop.
    pub fn spawn(
        n: usize,
        queue: Arc<WorkQueue>,
        registry: Arc<TaskRegistry>,
        workload: Arc<dyn Workload>,
        policy: AttemptPolicy,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let queue = Arc::clone(&queue);
            let registry = Arc::clone(&registry);
            let workload = Arc::clone(&workload);
            let policy = policy.clone();
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, registry, workload, policy, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Signal every worker to stop taking new work. In-flight attempts
    /// are not aborted.
    pub fn request_shutdown(&self) {
        // send only fails when every receiver is gone already
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for every worker loop to exit.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    registry: Arc<TaskRegistry>,
    workload: Arc<dyn Workload>,
    policy: AttemptPolicy,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Dequeue may block, so race it against the shutdown signal.
        let id = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            id = queue.pop() => id,
        };

        let Some(id) = id else {
            // queue closed and drained
            break;
        };

        run_task(
            worker_id,
            id,
            &registry,
            workload.as_ref(),
            &policy,
            shutdown_rx,
        )
        .await;
    }

    debug!(worker_id, "worker loop exited");
}

/// What an expired attempt means for the task.
enum Verdict {
    Retry,
    Exhausted,
    Cancelled,
}

/// Execute one dequeued id: re-read the canonical record, then run
/// attempts until the task settles or shutdown interrupts the backoff.
async fn run_task(
    worker_id: usize,
    id: TaskId,
    registry: &TaskRegistry,
    workload: &dyn Workload,
    policy: &AttemptPolicy,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            // Leave the record queued or retry-pending; stop() only waits
            // for attempts already in flight.
            return;
        }

        // The queued entry was a hint. The registry decides whether this
        // id still wants an attempt: it may have been cancelled, or the
        // entry may be stale in some other way.
        let token = registry
            .update(id, |record| {
                if record.start_attempt() {
                    Some(record.cancel_token())
                } else {
                    None
                }
            })
            .await
            .flatten();
        let Some(token) = token else {
            debug!(worker_id, task = %id, "skipping stale queue entry");
            return;
        };

        debug!(worker_id, task = %id, "attempt started");

        let outcome = tokio::time::timeout(policy.attempt_timeout, workload.perform(id)).await;

        match outcome {
            // Finished inside the deadline. Completion still defers to a
            // cancel that landed during the work.
            Ok(Ok(())) => {
                let completed = registry
                    .update(id, |record| record.mark_completed())
                    .await
                    .unwrap_or(false);
                if completed {
                    info!(worker_id, task = %id, "task completed");
                } else {
                    info!(worker_id, task = %id, "attempt finished after cancel, result dropped");
                }
                return;
            }

            // The workload itself failed: no automatic retry. Only an
            // explicit retry request revives the task.
            Ok(Err(err)) => {
                let failed = registry
                    .update(id, |record| record.mark_failed(err.to_string()))
                    .await
                    .unwrap_or(false);
                if failed {
                    warn!(worker_id, task = %id, error = %err, "task failed");
                }
                return;
            }

            // Deadline elapsed: attempt failure, drives automatic retry.
            Err(_elapsed) => {
                let verdict = registry
                    .update(id, |record| {
                        if record.is_cancel_requested() {
                            Verdict::Cancelled
                        } else if policy.is_exhausted(record.retry_count) {
                            record.mark_failed("attempt deadline elapsed, retries exhausted");
                            Verdict::Exhausted
                        } else {
                            record.schedule_retry("attempt deadline elapsed");
                            Verdict::Retry
                        }
                    })
                    .await
                    .unwrap_or(Verdict::Cancelled);

                match verdict {
                    Verdict::Cancelled => return,
                    Verdict::Exhausted => {
                        warn!(worker_id, task = %id, "retries exhausted, task failed");
                        return;
                    }
                    Verdict::Retry => {
                        debug!(
                            worker_id,
                            task = %id,
                            delay_ms = policy.retry_delay.as_millis() as u64,
                            "attempt expired, backing off"
                        );
                        // The backoff yields to shutdown; the record stays
                        // retry-pending in that case.
                        tokio::select! {
                            _ = shutdown_rx.changed() => return,
                            _ = tokio::time::sleep(policy.retry_delay) => {}
                        }
                        if token.is_cancelled() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::task::{TaskRecord, TaskStatus};
    use crate::workload::SimulatedWorkload;

    fn fast_policy() -> AttemptPolicy {
        AttemptPolicy {
            max_retries: 2,
            attempt_timeout: Duration::from_millis(200),
            retry_delay: Duration::from_millis(5),
        }
    }

    async fn wait_for_status(registry: &TaskRegistry, id: TaskId, status: TaskStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = registry.get(id).await.map(|record| record.status);
                if current == Some(status) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task never reached the expected status");
    }

    #[tokio::test]
    async fn completes_a_queued_record() {
        let queue = Arc::new(WorkQueue::new(8));
        let registry = Arc::new(TaskRegistry::new());
        let workload = Arc::new(SimulatedWorkload::new(Duration::from_millis(5)));
        let pool = WorkerPool::spawn(
            2,
            Arc::clone(&queue),
            Arc::clone(&registry),
            workload,
            fast_policy(),
        );

        let id = TaskId::generate();
        registry.insert(TaskRecord::new(id)).await.unwrap();
        queue.push(id).await.unwrap();

        wait_for_status(&registry, id, TaskStatus::Completed).await;

        queue.close();
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn stale_queue_entry_is_skipped() {
        let queue = Arc::new(WorkQueue::new(8));
        let registry = Arc::new(TaskRegistry::new());
        let workload = Arc::new(SimulatedWorkload::new(Duration::from_millis(5)));
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            Arc::clone(&registry),
            workload,
            fast_policy(),
        );

        let id = TaskId::generate();
        registry.insert(TaskRecord::new(id)).await.unwrap();
        registry
            .update(id, |record| record.request_cancel())
            .await
            .unwrap();
        queue.push(id).await.unwrap();

        // Give the worker a chance to (wrongly) pick it up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Cancelled);

        queue.close();
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn unknown_id_does_not_kill_the_worker() {
        let queue = Arc::new(WorkQueue::new(8));
        let registry = Arc::new(TaskRegistry::new());
        let workload = Arc::new(SimulatedWorkload::new(Duration::from_millis(5)));
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            Arc::clone(&registry),
            workload,
            fast_policy(),
        );

        // Never inserted into the registry.
        queue.push(TaskId::generate()).await.unwrap();

        // The same worker must still process real work afterwards.
        let id = TaskId::generate();
        registry.insert(TaskRecord::new(id)).await.unwrap();
        queue.push(id).await.unwrap();

        wait_for_status(&registry, id, TaskStatus::Completed).await;

        queue.close();
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn shutdown_joins_idle_workers() {
        let queue = Arc::new(WorkQueue::new(8));
        let registry = Arc::new(TaskRegistry::new());
        let workload = Arc::new(SimulatedWorkload::new(Duration::from_millis(5)));
        let pool = WorkerPool::spawn(
            3,
            Arc::clone(&queue),
            Arc::clone(&registry),
            workload,
            fast_policy(),
        );

        tokio::time::timeout(Duration::from_secs(1), pool.shutdown_and_join())
            .await
            .expect("idle workers must join promptly");
    }
}
