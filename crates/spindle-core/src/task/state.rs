//! Task status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a task.
///
/// State transitions:
/// - Queued -> Running -> Completed
/// - Queued -> Running -> Retrying -> Running (loop until the retry ceiling)
/// - Running -> Failed (workload failure, or automatic retries exhausted)
/// - Failed -> Retrying (explicit external retry, same ceiling)
/// - any non-terminal -> Cancelled
///
/// Completed and Cancelled are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the work queue for a free worker.
    Queued,

    /// An execution attempt is in flight.
    Running,

    /// Finished successfully.
    Completed,

    /// Last attempt failed; only an explicit retry request can revive it.
    Failed,

    /// Waiting for the next attempt (backoff or explicit retry pending).
    Retrying,

    /// Cancellation was requested and took effect.
    Cancelled,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// May a worker start an attempt for a task in this state?
    pub fn is_schedulable(self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Retrying)
    }

    /// Is the task still waiting for or performing work?
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            TaskStatus::Queued | TaskStatus::Running | TaskStatus::Retrying
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
