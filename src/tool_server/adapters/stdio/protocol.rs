//! JSON-RPC 2.0 message shapes for the MCP stdio protocol.

use crate::tool_server::ports::{RemoteTool, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol revision advertised during the handshake.
pub(super) const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC code for an unknown method.
pub(super) const METHOD_NOT_FOUND: i64 = -32601;

/// Server-initiated liveness check that must be answered with an empty result.
const PING: &str = "ping";

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub(super) const fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
}

impl<'a> JsonRpcNotification<'a> {
    pub(super) const fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
        }
    }
}

/// Reply to a request the server sent us.
#[derive(Debug, Serialize)]
pub(super) struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Serialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorBody { code, message }),
        }
    }
}

/// Any message read from the server's stdout.
#[derive(Debug, Deserialize)]
pub(super) struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl IncomingMessage {
    /// Returns the numeric id of a response; requests and notifications from
    /// the server yield `None`.
    pub(super) fn response_id(&self) -> Option<u64> {
        if self.method.is_some() {
            return None;
        }
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// Builds the reply owed for a server-initiated request.
    ///
    /// `ping` gets an empty result and every other method gets
    /// "method not found". Responses and notifications need no reply.
    pub(super) fn reply(&self) -> Option<JsonRpcResponse> {
        let method = self.method.as_deref()?;
        let id = self.id.clone()?;
        Some(if method == PING {
            JsonRpcResponse::result(id, Value::Object(serde_json::Map::new()))
        } else {
            JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
        })
    }

    /// Converts a response into its result payload.
    pub(super) fn into_result(self) -> Result<Value, TransportError> {
        if let Some(error) = self.error {
            return Err(TransportError::Remote {
                code: Some(error.code),
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitializeParams<'a> {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: ClientInfo<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct ClientInfo<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<RemoteTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenates the text blocks of the result content.
    pub(super) fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
