//! Caller-visible error taxonomy.
//!
//! Internal attempt conditions (deadline expiry, retries exhausted) never
//! surface here; they drive status transitions and log lines instead. No
//! task-level failure is fatal to the process.

use thiserror::Error;

use crate::task::{TaskId, TaskStatus};

#[derive(Debug, Error)]
pub enum SpindleError {
    /// Unknown identifier. Surfaced to the caller, never retried.
    #[error("task not found: id={0}")]
    NotFound(TaskId),

    /// The operation does not apply to the task's current state: cancel on
    /// a terminal task, or retry on a task that is not `failed` or is past
    /// its retry ceiling.
    #[error("task not eligible: id={id} status={status}")]
    NotEligible { id: TaskId, status: TaskStatus },

    /// Identifiers are assigned once and never reused.
    #[error("duplicate task: id={0}")]
    DuplicateTask(TaskId),

    /// The work queue has been closed by shutdown.
    #[error("work queue is closed")]
    QueueClosed,
}
