//! Cooperative cancellation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot cancellation signal shared between a registry entry and the
/// worker executing that task.
///
/// Design intent:
/// - `cancel()` is idempotent; only the first call reports having fired it.
/// - `is_cancelled()` is a non-blocking poll. Workers check it at attempt
///   boundaries, so cancellation stays cooperative; no wait primitive is
///   exposed outside the worker loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns true only for the call that fired it.
    pub fn cancel(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unfired() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn only_first_cancel_fires() {
        let token = CancelToken::new();

        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(!token.cancel());
    }

    #[test]
    fn clones_observe_the_same_signal() {
        let token = CancelToken::new();
        let handle = token.clone();

        token.cancel();

        assert!(handle.is_cancelled());
        assert!(!handle.cancel());
    }
}
