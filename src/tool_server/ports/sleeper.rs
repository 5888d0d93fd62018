//! Suspension port used between retry attempts.

use async_trait::async_trait;
use std::time::Duration;

/// Waits out a backoff delay.
///
/// Production code sleeps on the runtime timer; tests inject an
/// implementation that records or skips the delays.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackoffSleeper: Send + Sync {
    /// Suspends for `delay`. Dropping the future cancels the wait.
    async fn sleep(&self, delay: Duration);
}
