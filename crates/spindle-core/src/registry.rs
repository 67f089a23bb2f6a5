//! Task registry: the shared id -> record store.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::SpindleError;
use crate::task::{TaskId, TaskRecord, TaskStatus};

/// Per-status tally of registry entries, for status endpoints and logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub retrying: usize,
    pub cancelled: usize,
}

/// Shared mapping from task id to its canonical record.
///
/// Design intent:
/// - Readers take the shared lock, writers the exclusive one; either is
///   held only for the duration of a single operation, never across queue
///   operations or workload execution.
/// - `update` gives the mutator exclusive access to one logical change,
///   so readers never observe a half-written record.
/// - Records are never removed: every submitted id stays queryable for
///   the lifetime of the process.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record. Ids are never reused, so a second insert
    /// under the same id is an error.
    pub async fn insert(&self, record: TaskRecord) -> Result<(), SpindleError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&record.id) {
            return Err(SpindleError::DuplicateTask(record.id));
        }
        tasks.insert(record.id, record);
        Ok(())
    }

    /// Snapshot of one record.
    pub async fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Apply one mutation under the exclusive lock. Returns `None` for an
    /// unknown id, otherwise the mutator's result.
    pub async fn update<R>(
        &self,
        id: TaskId,
        mutate: impl FnOnce(&mut TaskRecord) -> R,
    ) -> Option<R> {
        let mut tasks = self.tasks.write().await;
        tasks.get_mut(&id).map(mutate)
    }

    /// Snapshot of every record.
    pub async fn list(&self) -> HashMap<TaskId, TaskRecord> {
        self.tasks.read().await.clone()
    }

    /// Tally records by status.
    pub async fn counts(&self) -> TaskCounts {
        let tasks = self.tasks.read().await;
        let mut counts = TaskCounts::default();
        for record in tasks.values() {
            match record.status {
                TaskStatus::Queued => counts.queued += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Retrying => counts.retrying += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
