//! Tagged result of a tool invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of invoking a tool.
///
/// Invocation failures are values, not errors: callers always receive an
/// explicit outcome and decide how to handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The tool returned a payload.
    Success(Value),
    /// The invocation failed with a human-readable message.
    Failure(String),
}

impl InvocationOutcome {
    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Returns `true` for successful outcomes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the payload of a successful outcome.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// Returns the message of a failed outcome.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }

    /// Converts the outcome into its wire representation.
    #[must_use]
    pub fn into_response(self) -> InvocationResponse {
        InvocationResponse::from(self)
    }
}

/// Wire form of an [`InvocationOutcome`]: `{success, data?, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Payload returned by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<InvocationOutcome> for InvocationResponse {
    fn from(outcome: InvocationOutcome) -> Self {
        match outcome {
            InvocationOutcome::Success(payload) => Self {
                success: true,
                data: Some(payload),
                error: None,
            },
            InvocationOutcome::Failure(message) => Self {
                success: false,
                data: None,
                error: Some(message),
            },
        }
    }
}
