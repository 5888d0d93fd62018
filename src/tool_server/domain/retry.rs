//! Retry policy and the capped exponential backoff it generates.

use super::ToolServerDomainError;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry configuration shared by connecting and invoking.
///
/// `max_retries` counts retries after the first try, so an operation runs at
/// most `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Creates a validated retry policy.
    ///
    /// Every delay, the first included, is clamped to `max_delay`, so an
    /// initial delay above the cap or a multiplier below one still yields a
    /// well-defined sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerDomainError::InvalidBackoffMultiplier`] when the
    /// multiplier is negative or not finite.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, ToolServerDomainError> {
        if !backoff_multiplier.is_finite() || backoff_multiplier < 0.0 {
            return Err(ToolServerDomainError::InvalidBackoffMultiplier(
                backoff_multiplier.to_string(),
            ));
        }

        Ok(Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        })
    }

    /// Policy that never retries and never sleeps.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Returns the number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total number of attempts, first try included.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Returns the delay cap.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the growth factor between consecutive delays.
    #[must_use]
    pub const fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Returns a fresh iterator over the backoff delays.
    ///
    /// The iterator yields exactly `max_retries` delays; element `i` is
    /// `min(initial_delay * multiplier^i, max_delay)`.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff {
            next_delay: self.initial_delay,
            remaining: self.max_retries,
            multiplier: self.backoff_multiplier,
            cap: self.max_delay,
        }
    }

    /// Returns the full backoff delay sequence.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.backoff().collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// Finite iterator over capped exponential backoff delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_delay: Duration,
    remaining: u32,
    multiplier: f64,
    cap: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.next_delay.min(self.cap);
        self.next_delay = scale_delay(current, self.multiplier, self.cap);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "backoff multipliers are fractional; the result is clamped to the cap"
)]
fn scale_delay(delay: Duration, multiplier: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier)
        .map_or(cap, |scaled| scaled.min(cap))
}
