//! Attempt policy: per-attempt deadline, retry ceiling, backoff delay.

use std::time::Duration;

/// Policy applied to every execution attempt.
///
/// The backoff is a fixed delay, not exponential: it exists to yield the
/// worker briefly between attempts, not to spread load over time.
#[derive(Debug, Clone)]
pub struct AttemptPolicy {
    /// Retries allowed beyond the first attempt. One ceiling, shared by
    /// automatic retries and explicit retry requests.
    pub max_retries: u32,

    /// Deadline for one attempt; expiry counts as attempt failure.
    pub attempt_timeout: Duration,

    /// Fixed delay between an expired attempt and the next one.
    pub retry_delay: Duration,
}

impl AttemptPolicy {
    /// Has this retry count spent the ceiling?
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

impl Default for AttemptPolicy {
    /// Reference values: 3 retries, 10s per attempt, 2s between attempts.
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
        }
    }
}
