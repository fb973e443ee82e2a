//! Combines a backoff interval function with a predicate deciding which
//! errors are worth retrying at all.

use std::sync::Arc;
use std::time::Duration;

use crate::backoff::IntervalFunction;

/// A predicate deciding whether a given error should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Pairs a backoff strategy with an optional retry predicate.
///
/// Without an explicit predicate, every error is considered retryable —
/// the caller's `max_attempts`/budget settings are the only limits.
pub struct RetryPolicy<E> {
    interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    pub fn new(interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Returns whether `error` should be retried.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Returns the delay before the retry at `attempt` (0-indexed).
    pub fn next_backoff(&self, attempt: usize) -> Duration {
        self.interval_fn.interval(attempt)
    }
}
