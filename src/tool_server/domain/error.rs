//! Error types for tool-server domain validation.

use thiserror::Error;

/// Errors returned while constructing tool-server domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolServerDomainError {
    /// The server name is empty after trimming.
    #[error("tool server name must not be empty")]
    EmptyServerName,

    /// The server name exceeds the 100-character limit.
    #[error("tool server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// The backoff multiplier is negative or not finite.
    #[error("backoff multiplier must be finite and non-negative, got {0}")]
    InvalidBackoffMultiplier(String),
}
