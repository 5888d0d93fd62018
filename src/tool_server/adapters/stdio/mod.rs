//! Process-based transport speaking MCP over stdio.
//!
//! Each connection launches the configured command, performs the MCP
//! `initialize` handshake, and then exchanges newline-delimited JSON-RPC 2.0
//! messages over the child's stdin and stdout.

mod process;
mod protocol;

pub use process::StdioConnection;

use crate::tool_server::{
    domain::ServerDescriptor,
    ports::{RemoteTool, ToolServerTransport, TransportError, TransportResult},
};
use async_trait::async_trait;
use protocol::{
    ClientInfo, InitializeParams, InitializeResult, METHOD_NOT_FOUND, PROTOCOL_VERSION,
    ToolCallResult, ToolsListResult,
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Tunables for [`StdioToolServerTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioTransportSettings {
    /// Timeout for the handshake and tool listing.
    pub request_timeout: Duration,
    /// Timeout for tool calls, which may legitimately run long.
    pub tool_call_timeout: Duration,
    /// How long a closing server may take to exit before it is killed.
    pub shutdown_grace: Duration,
    /// Client name reported during the handshake.
    pub client_name: String,
    /// Client version reported during the handshake.
    pub client_version: String,
}

impl Default for StdioTransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tool_call_timeout: DEFAULT_TOOL_CALL_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            client_name: env!("CARGO_PKG_NAME").to_owned(),
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Transport that launches tool servers as child processes.
#[derive(Debug, Clone, Default)]
pub struct StdioToolServerTransport {
    settings: StdioTransportSettings,
}

impl StdioToolServerTransport {
    /// Creates a transport with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport with explicit settings.
    #[must_use]
    pub const fn with_settings(settings: StdioTransportSettings) -> Self {
        Self { settings }
    }

    async fn initialize(&self, connection: &StdioConnection) -> TransportResult<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION,
            capabilities: json!({}),
            client_info: ClientInfo {
                name: &self.settings.client_name,
                version: &self.settings.client_version,
            },
        };
        let params_value =
            serde_json::to_value(params).map_err(|err| TransportError::Protocol(err.to_string()))?;

        let result = connection
            .request("initialize", Some(params_value), self.settings.request_timeout)
            .await
            .map_err(|err| TransportError::Handshake(err.to_string()))?;
        let initialized: InitializeResult = serde_json::from_value(result)
            .map_err(|err| TransportError::Handshake(format!("invalid initialize result: {err}")))?;

        let (server_name, server_version) = initialized
            .server_info
            .map(|info| (info.name, info.version))
            .unwrap_or_default();
        info!(
            server = %connection.server(),
            protocol_version = %initialized.protocol_version,
            remote_name = %server_name,
            remote_version = ?server_version,
            "tool server initialized"
        );

        connection
            .notify("notifications/initialized")
            .await
            .map_err(|err| TransportError::Handshake(err.to_string()))
    }
}

#[async_trait]
impl ToolServerTransport for StdioToolServerTransport {
    type Handle = StdioConnection;

    async fn open(&self, descriptor: &ServerDescriptor) -> TransportResult<Self::Handle> {
        let connection = StdioConnection::spawn(descriptor)?;

        if let Err(err) = self.initialize(&connection).await {
            if let Err(shutdown_err) = connection.shutdown(self.settings.shutdown_grace).await {
                warn!(
                    server = %descriptor.name(),
                    ignored_error = %shutdown_err,
                    "failed to stop tool server after handshake failure"
                );
            }
            return Err(err);
        }

        Ok(connection)
    }

    async fn close(&self, handle: &Self::Handle) -> TransportResult<()> {
        handle.shutdown(self.settings.shutdown_grace).await
    }

    async fn call(
        &self,
        handle: &Self::Handle,
        tool_name: &str,
        arguments: &Value,
    ) -> TransportResult<Value> {
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = handle
            .request("tools/call", Some(params), self.settings.tool_call_timeout)
            .await?;

        let parsed: ToolCallResult = serde_json::from_value(result.clone())
            .map_err(|err| TransportError::Protocol(format!("invalid tools/call result: {err}")))?;
        if parsed.is_error {
            let text = parsed.text();
            let message = if text.is_empty() {
                format!("tool '{tool_name}' reported an error")
            } else {
                text
            };
            return Err(TransportError::remote(message));
        }

        Ok(result)
    }

    async fn list_remote_tools(&self, handle: &Self::Handle) -> TransportResult<Vec<RemoteTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|value| json!({"cursor": value}));
            let result = match handle
                .request("tools/list", params, self.settings.request_timeout)
                .await
            {
                Ok(result) => result,
                Err(TransportError::Remote {
                    code: Some(METHOD_NOT_FOUND),
                    ..
                }) => {
                    debug!(server = %handle.server(), "tool server does not expose tools");
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err),
            };

            let page: ToolsListResult = serde_json::from_value(result).map_err(|err| {
                TransportError::Protocol(format!("invalid tools/list result: {err}"))
            })?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if cursor.as_ref() != Some(&next) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    async fn is_alive(&self, handle: &Self::Handle) -> bool {
        handle.is_alive().await
    }
}
