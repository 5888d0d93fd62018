//! Retryable/non-retryable classification of failure messages.

/// Lowercased message fragments that mark a failure as transient.
const RETRYABLE_PATTERNS: &[&str] = &[
    // timeouts
    "timeout",
    "timed out",
    "etimedout",
    // refused connections
    "econnrefused",
    "connection refused",
    // reset by peer
    "econnreset",
    "connection reset",
    "reset by peer",
    // aborted by timeout
    "econnaborted",
    "network",
    "unavailable",
];

/// Returns whether a failure message describes a transient condition.
///
/// Matching is case-insensitive. Empty messages are never retryable, and any
/// message outside the transient set (bad arguments, unknown tools, missing
/// servers) is treated as permanent.
#[must_use]
pub fn is_retryable(message: &str) -> bool {
    if message.trim().is_empty() {
        return false;
    }

    let lowered = message.to_lowercase();
    RETRYABLE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Classifies an optional failure message; `None` is never retryable.
#[must_use]
pub fn is_retryable_error(message: Option<&str>) -> bool {
    message.is_some_and(is_retryable)
}
