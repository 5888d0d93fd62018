//! In-memory transport adapter for deterministic connection tests.

use crate::tool_server::{
    domain::{ServerDescriptor, ToolServerName},
    ports::{RemoteTool, ToolServerTransport, TransportError, TransportResult},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle issued by [`InMemoryToolServerTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryHandle {
    id: u64,
    server: ToolServerName,
}

impl InMemoryHandle {
    /// Returns the server this handle was opened for.
    #[must_use]
    pub const fn server(&self) -> &ToolServerName {
        &self.server
    }
}

/// In-memory tool-server transport.
///
/// This adapter models connection behaviour without spawning external
/// processes. Failures are scripted per server, and every open, call and
/// close is counted so tests can assert on transport traffic. Tools without a
/// scripted result echo their name and arguments back.
#[derive(Debug, Clone, Default)]
pub struct InMemoryToolServerTransport {
    state: Arc<Mutex<InMemoryTransportState>>,
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    next_handle_id: u64,
    live_handles: HashMap<u64, ToolServerName>,
    tool_catalogs: HashMap<ToolServerName, Vec<RemoteTool>>,
    open_failures: HashMap<ToolServerName, VecDeque<String>>,
    unreachable: HashMap<ToolServerName, String>,
    call_results: HashMap<(ToolServerName, String), VecDeque<Result<Value, String>>>,
    listing_failures: HashMap<ToolServerName, String>,
    close_failures: HashMap<ToolServerName, String>,
    open_counts: HashMap<ToolServerName, usize>,
    call_counts: HashMap<ToolServerName, usize>,
    close_counts: HashMap<ToolServerName, usize>,
}

impl InMemoryToolServerTransport {
    /// Creates an empty in-memory transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryTransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Associates a tool catalogue with a server name.
    ///
    /// Existing catalogue entries are replaced.
    pub fn set_tool_catalog(&self, server: ToolServerName, tools: Vec<RemoteTool>) {
        self.state().tool_catalogs.insert(server, tools);
    }

    /// Makes the next open for `server` fail with `message`.
    ///
    /// Repeated calls queue further failures; once the queue drains, opens
    /// succeed again.
    pub fn push_open_failure(&self, server: ToolServerName, message: impl Into<String>) {
        self.state()
            .open_failures
            .entry(server)
            .or_default()
            .push_back(message.into());
    }

    /// Makes every open for `server` fail with `message`.
    pub fn set_unreachable(&self, server: ToolServerName, message: impl Into<String>) {
        self.state().unreachable.insert(server, message.into());
    }

    /// Queues results for the next calls of `tool_name` on `server`.
    ///
    /// `Err` entries surface as remote failures carrying the given message.
    pub fn push_call_results(
        &self,
        server: ToolServerName,
        tool_name: impl Into<String>,
        results: impl IntoIterator<Item = Result<Value, String>>,
    ) {
        self.state()
            .call_results
            .entry((server, tool_name.into()))
            .or_default()
            .extend(results);
    }

    /// Makes tool listing for `server` fail with `message`.
    pub fn fail_tool_listing(&self, server: ToolServerName, message: impl Into<String>) {
        self.state()
            .listing_failures
            .insert(server, message.into());
    }

    /// Makes closing handles for `server` fail with `message`.
    pub fn fail_close(&self, server: ToolServerName, message: impl Into<String>) {
        self.state().close_failures.insert(server, message.into());
    }

    /// Severs every live handle for `server`, as if the process had exited.
    pub fn sever(&self, server: &ToolServerName) {
        self.state()
            .live_handles
            .retain(|_, owner| owner != server);
    }

    /// Returns how many times `server` was opened.
    #[must_use]
    pub fn open_count(&self, server: &str) -> usize {
        self.state().open_counts.get(server).copied().unwrap_or(0)
    }

    /// Returns how many tool calls reached `server`.
    #[must_use]
    pub fn call_count(&self, server: &str) -> usize {
        self.state().call_counts.get(server).copied().unwrap_or(0)
    }

    /// Returns how many times a handle for `server` was closed.
    #[must_use]
    pub fn close_count(&self, server: &str) -> usize {
        self.state().close_counts.get(server).copied().unwrap_or(0)
    }

    /// Returns the number of handles that are open and live.
    #[must_use]
    pub fn live_handle_count(&self) -> usize {
        self.state().live_handles.len()
    }
}

#[async_trait]
impl ToolServerTransport for InMemoryToolServerTransport {
    type Handle = InMemoryHandle;

    async fn open(&self, descriptor: &ServerDescriptor) -> TransportResult<Self::Handle> {
        let mut state = self.state();
        let server = descriptor.name().clone();
        *state.open_counts.entry(server.clone()).or_default() += 1;

        if let Some(message) = state.unreachable.get(&server) {
            return Err(TransportError::remote(message.clone()));
        }

        let queued_failure = state
            .open_failures
            .get_mut(&server)
            .and_then(VecDeque::pop_front);
        if let Some(message) = queued_failure {
            return Err(TransportError::remote(message));
        }

        state.next_handle_id += 1;
        let id = state.next_handle_id;
        state.live_handles.insert(id, server.clone());
        Ok(InMemoryHandle { id, server })
    }

    async fn close(&self, handle: &Self::Handle) -> TransportResult<()> {
        let mut state = self.state();
        *state.close_counts.entry(handle.server.clone()).or_default() += 1;
        state.live_handles.remove(&handle.id);

        match state.close_failures.get(&handle.server) {
            Some(message) => Err(TransportError::remote(message.clone())),
            None => Ok(()),
        }
    }

    async fn call(
        &self,
        handle: &Self::Handle,
        tool_name: &str,
        arguments: &Value,
    ) -> TransportResult<Value> {
        let mut state = self.state();
        *state.call_counts.entry(handle.server.clone()).or_default() += 1;

        if !state.live_handles.contains_key(&handle.id) {
            return Err(TransportError::Closed);
        }

        let scripted = state
            .call_results
            .get_mut(&(handle.server.clone(), tool_name.to_owned()))
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(message)) => Err(TransportError::remote(message)),
            None => Ok(json!({"tool": tool_name, "arguments": arguments})),
        }
    }

    async fn list_remote_tools(&self, handle: &Self::Handle) -> TransportResult<Vec<RemoteTool>> {
        let state = self.state();
        if !state.live_handles.contains_key(&handle.id) {
            return Err(TransportError::Closed);
        }

        if let Some(message) = state.listing_failures.get(&handle.server) {
            return Err(TransportError::remote(message.clone()));
        }

        Ok(state
            .tool_catalogs
            .get(&handle.server)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_alive(&self, handle: &Self::Handle) -> bool {
        self.state().live_handles.contains_key(&handle.id)
    }
}
