//! Transport port for reaching out-of-process tool servers.

use crate::tool_server::domain::ServerDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Request/response plumbing to a tool server.
///
/// `open` covers the whole establishment sequence (launching the server,
/// building the client, and the protocol handshake). The returned handle is
/// owned by exactly one registry entry.
#[async_trait]
pub trait ToolServerTransport: Send + Sync {
    /// Live client handle for one server.
    type Handle: Send + Sync + 'static;

    /// Establishes a connection described by `descriptor`.
    async fn open(&self, descriptor: &ServerDescriptor) -> TransportResult<Self::Handle>;

    /// Releases the connection. Closing an already-closed handle succeeds.
    async fn close(&self, handle: &Self::Handle) -> TransportResult<()>;

    /// Invokes a tool and returns its raw payload.
    async fn call(
        &self,
        handle: &Self::Handle,
        tool_name: &str,
        arguments: &Value,
    ) -> TransportResult<Value>;

    /// Lists the tools advertised by the server.
    async fn list_remote_tools(&self, handle: &Self::Handle) -> TransportResult<Vec<RemoteTool>>;

    /// Reports whether the underlying connection is still live.
    async fn is_alive(&self, handle: &Self::Handle) -> bool;
}

/// Tool metadata exactly as the server reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTool {
    /// Tool name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Raw JSON schema for the arguments.
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Errors returned by transport adapters.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server process could not be launched.
    #[error("failed to spawn '{command}': {reason}")]
    Spawn {
        /// Command that failed to launch.
        command: String,
        /// Reason reported by the operating system.
        reason: String,
    },

    /// The protocol handshake was rejected or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server replied with a JSON-RPC error or a tool-level error.
    #[error("{message}")]
    Remote {
        /// JSON-RPC error code, when the server supplied one.
        code: Option<i64>,
        /// Message reported by the server.
        message: String,
    },

    /// A response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No response arrived in time.
    #[error("request '{method}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// JSON-RPC method that timed out.
        method: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The connection is closed; the server is unavailable.
    #[error("connection closed: server unavailable")]
    Closed,

    /// Generic runtime failure.
    #[error("transport runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps a runtime error from the transport adapter.
    #[must_use]
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }

    /// Creates a remote error without a JSON-RPC code.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            code: None,
            message: message.into(),
        }
    }
}
