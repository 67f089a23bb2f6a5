//! Task record: the canonical per-task entry in the registry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CancelToken, TaskId, TaskStatus};

/// Canonical record for one task.
///
/// Design:
/// - The registry entry is the single source of truth; the work queue
///   only carries `TaskId`s, so a queued copy can never diverge from this
///   record.
/// - State transitions happen via methods, not direct field writes, so
///   the state machine edges are enforced in one place.
/// - The cancel token is control state, not observable state: it is
///   shared with the executing worker and never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,

    /// Execution attempts beyond the first. Incremented when an attempt
    /// starts from `Retrying`, so automatic and explicit retries share
    /// one count and no attempt is counted twice.
    pub retry_count: u32,

    /// Last failure message (deadline expiry or workload error).
    pub last_error: Option<String>,

    /// Timestamps for observability.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    cancel: CancelToken,
}

impl TaskRecord {
    pub fn new(id: TaskId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TaskStatus::Queued,
            retry_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            cancel: CancelToken::new(),
        }
    }

    /// Handle to this task's cancel token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queued/Retrying -> Running. Starting from `Retrying` consumes a
    /// retry. Refused for any other state, so a stale queue entry (for a
    /// task cancelled or completed meanwhile) is simply skipped.
    pub fn start_attempt(&mut self) -> bool {
        if !self.status.is_schedulable() {
            return false;
        }
        if self.status == TaskStatus::Retrying {
            self.retry_count += 1;
        }
        self.status = TaskStatus::Running;
        self.touch();
        true
    }

    /// Running -> Completed. Refused once cancellation was requested: a
    /// cancelled task never completes.
    pub fn mark_completed(&mut self) -> bool {
        if self.status != TaskStatus::Running || self.cancel.is_cancelled() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.touch();
        true
    }

    /// -> Failed with the failure recorded. Refused on terminal states.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.last_error = Some(error.into());
        self.touch();
        true
    }

    /// Running -> Retrying after a deadline expiry. The consumed retry is
    /// counted when the next attempt starts.
    pub fn schedule_retry(&mut self, error: impl Into<String>) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.status = TaskStatus::Retrying;
        self.last_error = Some(error.into());
        self.touch();
        true
    }

    /// Failed -> Retrying for an explicit external retry request.
    pub fn mark_retrying(&mut self) -> bool {
        if self.status != TaskStatus::Failed {
            return false;
        }
        self.status = TaskStatus::Retrying;
        self.touch();
        true
    }

    /// Fire the cancel token and mark the record Cancelled. Refused on
    /// terminal states, so repeated cancel requests report failure
    /// instead of being re-applied.
    pub fn request_cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.cancel.cancel();
        self.status = TaskStatus::Cancelled;
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_queued() {
        let record = TaskRecord::new(TaskId::generate());

        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.retry_count, 0);
        assert!(record.last_error.is_none());
    }

    #[test]
    fn first_attempt_does_not_consume_a_retry() {
        let mut record = TaskRecord::new(TaskId::generate());

        assert!(record.start_attempt());
        assert_eq!(record.status, TaskStatus::Running);
        assert_eq!(record.retry_count, 0);
    }

    #[test]
    fn attempt_from_retrying_consumes_a_retry() {
        let mut record = TaskRecord::new(TaskId::generate());
        record.start_attempt();
        record.schedule_retry("attempt deadline elapsed");

        assert!(record.start_attempt());
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.status, TaskStatus::Running);
    }

    #[test]
    fn completion_defers_to_cancellation() {
        let mut record = TaskRecord::new(TaskId::generate());
        record.start_attempt();

        // Cancel lands while the attempt is in flight.
        assert!(record.request_cancel());
        assert!(!record.mark_completed());
        assert_eq!(record.status, TaskStatus::Cancelled);
    }

    #[test]
    fn cancel_is_rejected_on_terminal_states() {
        let mut record = TaskRecord::new(TaskId::generate());
        record.start_attempt();
        record.mark_completed();
        assert!(!record.request_cancel());
        assert_eq!(record.status, TaskStatus::Completed);

        let mut record = TaskRecord::new(TaskId::generate());
        assert!(record.request_cancel());
        assert!(!record.request_cancel());
    }

    #[test]
    fn explicit_retry_only_from_failed() {
        let mut record = TaskRecord::new(TaskId::generate());
        assert!(!record.mark_retrying());

        record.start_attempt();
        record.mark_failed("simulated failure");
        assert!(record.mark_retrying());
        assert_eq!(record.status, TaskStatus::Retrying);
    }

    #[test]
    fn stale_entry_cannot_start_an_attempt() {
        let mut record = TaskRecord::new(TaskId::generate());
        record.request_cancel();

        assert!(!record.start_attempt());
        assert_eq!(record.status, TaskStatus::Cancelled);
    }

    #[test]
    fn failure_is_recorded_on_the_record() {
        let mut record = TaskRecord::new(TaskId::generate());
        record.start_attempt();
        record.mark_failed("boom");

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn cancel_token_is_not_serialized() {
        let record = TaskRecord::new(TaskId::generate());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("cancel").is_none());
        assert_eq!(json["status"], "queued");
        assert_eq!(json["retry_count"], 0);
    }
}
