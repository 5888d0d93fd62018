//! Timer-backed backoff sleeper.

use crate::tool_server::ports::BackoffSleeper;
use async_trait::async_trait;
use std::time::Duration;

/// Sleeps on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl BackoffSleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Sleeper that returns immediately, for flows that retry without waiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleeper;

#[async_trait]
impl BackoffSleeper for NoopSleeper {
    async fn sleep(&self, _delay: Duration) {}
}
