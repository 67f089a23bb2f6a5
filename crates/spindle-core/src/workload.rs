//! Workload abstraction: the unit of work a task performs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::task::TaskId;

/// Failure reported by a workload. Recorded on the task's registry entry;
/// the task can only be revived by an explicit retry request.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct WorkloadError(String);

impl WorkloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One unit of work, injected into the worker pool so real workloads can
/// be substituted without touching the scheduling logic.
///
/// The deadline is enforced outside this trait: the worker bounds
/// `perform` with the attempt timeout, so implementations carry no timing
/// logic of their own.
#[async_trait]
pub trait Workload: Send + Sync {
    async fn perform(&self, id: TaskId) -> Result<(), WorkloadError>;
}

/// Synthetic workload: simulates a fixed duration of work, optionally
/// failing the first `n` invocations.
pub struct SimulatedWorkload {
    duration: Duration,
    remaining_failures: AtomicU32,
}

impl SimulatedWorkload {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining_failures: AtomicU32::new(0),
        }
    }

    /// Fail the first `n` invocations with a synthetic error.
    pub fn with_failures(self, n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
            ..self
        }
    }
}

impl Default for SimulatedWorkload {
    /// Reference workload: five seconds of simulated work.
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Workload for SimulatedWorkload {
    async fn perform(&self, id: TaskId) -> Result<(), WorkloadError> {
        tokio::time::sleep(self.duration).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(WorkloadError::new(format!(
                "simulated failure for {id} (left={left})"
            )));
        }
        Ok(())
    }
}
