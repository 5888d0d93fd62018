//! Connection lifecycle and tool invocation service.

use super::{ConnectionRegistry, Replaced};
use crate::tool_server::{
    domain::{
        Connection, ConnectionStats, InvocationOutcome, RetryPolicy, ServerDescriptor,
        ToolDescriptor, ToolInputSchema, ToolServerName, is_retryable,
    },
    ports::{BackoffSleeper, RemoteTool, ToolServerTransport, TransportError},
};
use futures::future::join_all;
use mockable::Clock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned while establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Opening the transport or the handshake failed.
    #[error("failed to connect to {server}: {source}")]
    Handshake {
        /// Server that could not be reached.
        server: ToolServerName,
        /// Underlying transport failure.
        source: TransportError,
    },

    /// Every connect attempt failed.
    #[error("failed to connect to {server} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Server that could not be reached.
        server: ToolServerName,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },
}

/// Result type for connection operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Tool-server connection and invocation service.
///
/// The service owns the connection registry and composes the transport,
/// failure classification, and backoff policy into connect and invoke
/// operations. All operations take `&self` and may run concurrently.
pub struct ToolInvocationService<T, C, S>
where
    T: ToolServerTransport,
    C: Clock + Send + Sync,
    S: BackoffSleeper,
{
    transport: Arc<T>,
    registry: ConnectionRegistry<T::Handle>,
    clock: Arc<C>,
    sleeper: Arc<S>,
    retry_policy: RetryPolicy,
}

impl<T, C, S> ToolInvocationService<T, C, S>
where
    T: ToolServerTransport,
    C: Clock + Send + Sync,
    S: BackoffSleeper,
{
    /// Creates a service using the default retry policy.
    #[must_use]
    pub fn new(transport: Arc<T>, clock: Arc<C>, sleeper: Arc<S>) -> Self {
        Self {
            transport,
            registry: ConnectionRegistry::new(),
            clock,
            sleeper,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used by every retrying operation.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Returns the retry policy in effect.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Connects to the server described by `descriptor`.
    ///
    /// Connecting an already-connected name is a no-op. A registered but
    /// disconnected entry is torn down before the new connection is opened.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Handshake`] when the transport cannot be
    /// opened; the registry is left without an entry for the name.
    pub async fn connect(&self, descriptor: ServerDescriptor) -> ConnectResult<()> {
        let name = descriptor.name().clone();
        match self.registry.get(name.as_str()) {
            Some(existing) if existing.is_connected() => {
                debug!(server = %name, "already connected");
                return Ok(());
            }
            Some(_) => {
                debug!(server = %name, "replacing disconnected entry");
                self.disconnect(name.as_str()).await;
            }
            None => {}
        }

        let handle = self
            .transport
            .open(&descriptor)
            .await
            .map_err(|source| ConnectError::Handshake {
                server: name.clone(),
                source,
            })?;

        let connection = Connection::established(descriptor, handle, &*self.clock);
        info!(server = %name, connection_id = %connection.id(), "connected to tool server");
        if let Some(replaced) = self.registry.put(connection) {
            debug!(server = %name, "concurrent connect replaced an entry");
            self.close_handle(&replaced).await;
        }
        Ok(())
    }

    /// Connects with retry, sleeping the backoff delay between attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::RetriesExhausted`] with the attempt count and
    /// the final cause once every attempt has failed.
    pub async fn connect_with_retry(&self, descriptor: ServerDescriptor) -> ConnectResult<()> {
        let mut backoff = self.retry_policy.backoff();
        let mut attempts: u32 = 0;

        let last_error = loop {
            attempts += 1;
            let error = match self.connect(descriptor.clone()).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };

            let Some(delay) = backoff.next() else {
                break error;
            };
            warn!(
                server = %descriptor.name(),
                attempt = attempts,
                delay_ms = delay.as_millis(),
                error = %error,
                "connect attempt failed; retrying"
            );
            self.sleeper.sleep(delay).await;
        };

        Err(ConnectError::RetriesExhausted {
            server: descriptor.name().clone(),
            attempts,
            last_error: last_error.to_string(),
        })
    }

    /// Connects every descriptor with retry, concurrently.
    pub async fn connect_all(
        &self,
        descriptors: impl IntoIterator<Item = ServerDescriptor>,
    ) -> BTreeMap<ToolServerName, ConnectResult<()>> {
        let attempts = descriptors.into_iter().map(|descriptor| async move {
            let name = descriptor.name().clone();
            (name, self.connect_with_retry(descriptor).await)
        });
        join_all(attempts).await.into_iter().collect()
    }

    /// Invokes `tool_name` on the server registered as `name`.
    ///
    /// Never reconnects. A failed call marks the entry disconnected only when
    /// the transport reports the connection is no longer live.
    pub async fn invoke(&self, name: &str, tool_name: &str, arguments: &Value) -> InvocationOutcome {
        let Some(connection) = self.registry.get(name) else {
            return InvocationOutcome::failure(format!("{name} not connected"));
        };
        if !connection.is_connected() {
            return InvocationOutcome::failure(format!("{name} is disconnected"));
        }

        debug!(server = name, tool = tool_name, "invoking tool");
        let result = self
            .transport
            .call(connection.handle(), tool_name, arguments)
            .await;
        let alive = match &result {
            Ok(_) => true,
            Err(_) => self.transport.is_alive(connection.handle()).await,
        };

        let applied = self.registry.update(name, connection.id(), |entry| {
            if result.is_ok() {
                entry.record_success(&*self.clock);
            } else {
                entry.record_failure(&*self.clock);
            }
            if !alive {
                entry.mark_disconnected();
            }
        });
        match (applied, alive) {
            (false, _) => debug!(server = name, "connection was replaced during the call"),
            (true, false) => warn!(server = name, "transport reports connection lost"),
            (true, true) => {}
        }

        match result {
            Ok(payload) => InvocationOutcome::Success(payload),
            Err(error) => InvocationOutcome::Failure(error.to_string()),
        }
    }

    /// Invokes a tool, retrying transient failures with backoff.
    ///
    /// Permanent failures return after the first attempt. Before retrying,
    /// a disconnected entry is reconnected on a best-effort basis from its
    /// stored descriptor. A failed reconnect keeps the disconnected entry, so
    /// later attempts reconnect again until the attempts run out.
    pub async fn invoke_with_retry(
        &self,
        name: &str,
        tool_name: &str,
        arguments: &Value,
    ) -> InvocationOutcome {
        let mut backoff = self.retry_policy.backoff();
        let mut attempts: u32 = 0;
        let mut reconnect_error: Option<TransportError> = None;

        let last_error = loop {
            attempts += 1;
            let error = match self.invoke(name, tool_name, arguments).await {
                InvocationOutcome::Success(payload) => {
                    return InvocationOutcome::Success(payload);
                }
                InvocationOutcome::Failure(error) => error,
            };

            let error = match reconnect_error.take() {
                Some(cause) if self.is_disconnected(name) => {
                    format!("{error}; reconnect failed: {cause}")
                }
                _ if is_retryable(&error) => error,
                _ => {
                    debug!(server = name, tool = tool_name, error = %error, "failure is not retryable");
                    return InvocationOutcome::Failure(error);
                }
            };

            let Some(delay) = backoff.next() else {
                break error;
            };
            warn!(
                server = name,
                tool = tool_name,
                attempt = attempts,
                delay_ms = delay.as_millis(),
                error = %error,
                "invocation failed; retrying"
            );
            if let Err(error) = self.reconnect_if_disconnected(name).await {
                warn!(server = name, ignored_error = %error, "best-effort reconnect failed");
                reconnect_error = Some(error);
            }
            self.sleeper.sleep(delay).await;
        };

        InvocationOutcome::failure(format!(
            "{tool_name} on {name} failed after {attempts} attempts: {last_error}"
        ))
    }

    fn is_disconnected(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .is_some_and(|connection| !connection.is_connected())
    }

    /// Opens a fresh connection for a disconnected entry and swaps it in.
    ///
    /// The stale entry stays registered until the new handle is open, so a
    /// failed reopen leaves it in place for the next attempt.
    async fn reconnect_if_disconnected(&self, name: &str) -> Result<(), TransportError> {
        let Some(stale) = self.registry.get(name) else {
            return Ok(());
        };
        if stale.is_connected() {
            return Ok(());
        }

        info!(server = name, "reconnecting before next attempt");
        let handle = self.transport.open(stale.descriptor()).await?;
        let fresh = Connection::established(stale.descriptor().clone(), handle, &*self.clock);
        let fresh_id = fresh.id();

        match self.registry.replace(stale.id(), fresh) {
            Replaced::Previous(previous) => {
                info!(server = name, connection_id = %fresh_id, "reconnected to tool server");
                self.close_handle(&previous).await;
            }
            Replaced::Rejected(unused) => {
                debug!(server = name, "entry changed during reconnect");
                self.close_handle(&unused).await;
            }
        }
        Ok(())
    }

    /// Lists the tools exposed by the server registered as `name`.
    ///
    /// Absent or disconnected servers and failed queries yield an empty list.
    pub async fn list_tools(&self, name: &str) -> Vec<ToolDescriptor> {
        let Some(connection) = self.registry.get(name) else {
            return Vec::new();
        };
        if !connection.is_connected() {
            return Vec::new();
        }

        match self.transport.list_remote_tools(connection.handle()).await {
            Ok(remote_tools) => remote_tools.into_iter().map(to_tool_descriptor).collect(),
            Err(error) => {
                warn!(server = name, ignored_error = %error, "tool listing failed");
                Vec::new()
            }
        }
    }

    /// Lists tools for every registered server, connected or not.
    pub async fn list_all_tools(&self) -> BTreeMap<ToolServerName, Vec<ToolDescriptor>> {
        let listings = self.registry.names().into_iter().map(|name| async move {
            let tools = self.list_tools(name.as_str()).await;
            (name, tools)
        });
        join_all(listings).await.into_iter().collect()
    }

    /// Disconnects the server registered as `name`.
    ///
    /// The entry is removed even if closing the transport fails.
    pub async fn disconnect(&self, name: &str) {
        let Some(connection) = self.registry.remove(name) else {
            return;
        };
        self.close_handle(&connection).await;
        info!(server = name, "disconnected from tool server");
    }

    /// Disconnects every registered server concurrently.
    pub async fn disconnect_all(&self) {
        let names = self.registry.names();
        join_all(names.iter().map(|name| self.disconnect(name.as_str()))).await;
    }

    /// Returns the names of connected servers.
    #[must_use]
    pub fn list_connected(&self) -> Vec<ToolServerName> {
        self.registry.list_connected()
    }

    /// Returns a health snapshot for every registered server.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<ToolServerName, ConnectionStats> {
        self.registry.stats()
    }

    async fn close_handle(&self, connection: &Connection<T::Handle>) {
        if let Err(error) = self.transport.close(connection.handle()).await {
            warn!(
                server = %connection.name(),
                ignored_error = %error,
                "failed to close tool server connection"
            );
        }
    }
}

fn to_tool_descriptor(remote: RemoteTool) -> ToolDescriptor {
    let input_schema = remote
        .input_schema
        .as_ref()
        .and_then(ToolInputSchema::from_json);
    ToolDescriptor::new(remote.name)
        .with_description(remote.description)
        .with_input_schema(input_schema)
}
