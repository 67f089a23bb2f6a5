//! Task manager: composes the registry, the work queue, and the worker
//! pool, and owns the consistency guarantees of the public operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SpindleError;
use crate::queue::WorkQueue;
use crate::registry::{TaskCounts, TaskRegistry};
use crate::retry::AttemptPolicy;
use crate::task::{TaskId, TaskRecord, TaskStatus};
use crate::worker::WorkerPool;
use crate::workload::Workload;

/// Manager configuration. Durations are carried as milliseconds so the
/// struct deserializes cleanly from JSON or TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Number of concurrent worker loops.
    pub workers: usize,

    /// Work queue capacity; a full queue blocks submitters.
    pub queue_capacity: usize,

    /// Retries allowed beyond the first attempt.
    pub max_retries: u32,

    /// Per-attempt deadline.
    pub attempt_timeout_ms: u64,

    /// Fixed delay between an expired attempt and the next one.
    pub retry_delay_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
            max_retries: 3,
            attempt_timeout_ms: 10_000,
            retry_delay_ms: 2_000,
        }
    }
}

impl ManagerConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn policy(&self) -> AttemptPolicy {
        AttemptPolicy {
            max_retries: self.max_retries,
            attempt_timeout: self.attempt_timeout(),
            retry_delay: self.retry_delay(),
        }
    }
}

/// Orchestrates the task lifecycle: submit, status, cancel, list, retry,
/// stop.
pub struct TaskManager {
    registry: Arc<TaskRegistry>,
    queue: Arc<WorkQueue>,
    pool: Mutex<Option<WorkerPool>>,
    config: ManagerConfig,
}

impl TaskManager {
    /// Build the manager and start its workers.
    pub fn new(config: ManagerConfig, workload: Arc<dyn Workload>) -> Self {
        let registry = Arc::new(TaskRegistry::new());
        let queue = Arc::new(WorkQueue::new(config.queue_capacity));
        let pool = WorkerPool::spawn(
            config.workers,
            Arc::clone(&queue),
            Arc::clone(&registry),
            workload,
            config.policy(),
        );

        Self {
            registry,
            queue,
            pool: Mutex::new(Some(pool)),
            config,
        }
    }

    /// Submit a new task under a generated id.
    pub async fn submit(&self) -> Result<TaskId, SpindleError> {
        let id = TaskId::generate();
        self.submit_with_id(id).await?;
        Ok(id)
    }

    /// Submit a new task under a caller-provided id (transport layers
    /// mint their own). Blocks while the queue is full; that is the only
    /// admission control.
    pub async fn submit_with_id(&self, id: TaskId) -> Result<(), SpindleError> {
        self.registry.insert(TaskRecord::new(id)).await?;

        if let Err(err) = self.queue.push(id).await {
            // Shutdown raced the submit. The record exists but will never
            // be scheduled; settle it as cancelled.
            self.registry
                .update(id, |record| record.request_cancel())
                .await;
            return Err(err);
        }

        debug!(task = %id, "task submitted");
        Ok(())
    }

    /// Snapshot of one task.
    pub async fn status(&self, id: TaskId) -> Result<TaskRecord, SpindleError> {
        self.registry
            .get(id)
            .await
            .ok_or(SpindleError::NotFound(id))
    }

    /// Request cooperative cancellation: fire the task's cancel token and
    /// mark it cancelled. Rejected for unknown ids and for tasks already
    /// terminal, repeat cancels included.
    pub async fn cancel(&self, id: TaskId) -> Result<(), SpindleError> {
        let result = self
            .registry
            .update(id, |record| {
                let status = record.status;
                if record.request_cancel() {
                    Ok(())
                } else {
                    Err(SpindleError::NotEligible { id, status })
                }
            })
            .await
            .ok_or(SpindleError::NotFound(id))?;

        if result.is_ok() {
            info!(task = %id, "task cancelled");
        }
        result
    }

    /// Snapshot of every task. No pagination; the registry is the full,
    /// unbounded history of the process.
    pub async fn list(&self) -> HashMap<TaskId, TaskRecord> {
        self.registry.list().await
    }

    /// Per-status tally of all tasks.
    pub async fn counts(&self) -> TaskCounts {
        self.registry.counts().await
    }

    /// Re-queue a failed task. Eligible only when the status is exactly
    /// `failed` and the retry ceiling has room; the consumed retry is
    /// counted when the attempt starts.
    pub async fn retry(&self, id: TaskId) -> Result<(), SpindleError> {
        let max_retries = self.config.max_retries;
        self.registry
            .update(id, |record| {
                let status = record.status;
                if status != TaskStatus::Failed || record.retry_count >= max_retries {
                    return Err(SpindleError::NotEligible { id, status });
                }
                record.mark_retrying();
                Ok(())
            })
            .await
            .ok_or(SpindleError::NotFound(id))??;

        // Push outside the registry lock; submission backpressure applies
        // to retries too.
        self.queue.push(id).await?;
        info!(task = %id, "task re-queued for retry");
        Ok(())
    }

    /// Stop taking new work and wait for in-flight attempts to resolve.
    /// Safe to call more than once.
    pub async fn stop(&self) {
        info!("task manager stopping");
        self.queue.close();

        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            pool.shutdown_and_join().await;
        }
        info!("task manager stopped");
    }
}
