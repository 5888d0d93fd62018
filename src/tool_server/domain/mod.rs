//! Domain model for tool-server connections and invocations.
//!
//! The domain models server identity and launch parameters, per-connection
//! health bookkeeping, retry policy, failure classification, invocation
//! outcomes, and discovered tool metadata. Process and stream plumbing stays
//! outside this boundary.

mod classify;
mod connection;
mod descriptor;
mod error;
mod ids;
mod outcome;
mod retry;
mod tool;

pub use classify::{is_retryable, is_retryable_error};
pub use connection::{Connection, ConnectionStats};
pub use descriptor::ServerDescriptor;
pub use error::ToolServerDomainError;
pub use ids::{ConnectionId, ToolServerName};
pub use outcome::{InvocationOutcome, InvocationResponse};
pub use retry::{Backoff, RetryPolicy};
pub use tool::{ToolDescriptor, ToolInputSchema};
