//! Runtime connection state for a registered tool server.

use super::{ConnectionId, ServerDescriptor, ToolServerName};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Live connection to one tool server.
///
/// The transport handle belongs to this entry alone. Callers receive cloned
/// snapshots whose handle is shared only for the duration of a single round
/// trip; the registry entry remains the owner.
pub struct Connection<H> {
    id: ConnectionId,
    descriptor: ServerDescriptor,
    handle: Arc<H>,
    connected: bool,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    retry_count: u32,
}

impl<H> Connection<H> {
    /// Creates a freshly established connection.
    #[must_use]
    pub fn established(descriptor: ServerDescriptor, handle: H, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ConnectionId::new(),
            descriptor,
            handle: Arc::new(handle),
            connected: true,
            connected_at: timestamp,
            last_activity: timestamp,
            retry_count: 0,
        }
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the server name this connection is bound to.
    #[must_use]
    pub const fn name(&self) -> &ToolServerName {
        self.descriptor.name()
    }

    /// Returns the descriptor the connection was opened from.
    #[must_use]
    pub const fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    /// Returns the transport handle.
    #[must_use]
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Returns whether the transport is considered live.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns when the connection was established.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns the timestamp of the latest invocation attempt.
    #[must_use]
    pub const fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Returns the number of failed invocations since the last success.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Records a successful invocation.
    pub fn record_success(&mut self, clock: &impl Clock) {
        self.last_activity = clock.utc();
        self.retry_count = 0;
    }

    /// Records a failed invocation.
    pub fn record_failure(&mut self, clock: &impl Clock) {
        self.last_activity = clock.utc();
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Marks the transport as no longer live.
    pub const fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    /// Returns an observability snapshot without the transport handle.
    #[must_use]
    pub const fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            connected: self.connected,
            last_activity: self.last_activity,
            retry_count: self.retry_count,
        }
    }
}

impl<H> Clone for Connection<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            descriptor: self.descriptor.clone(),
            handle: Arc::clone(&self.handle),
            connected: self.connected,
            connected_at: self.connected_at,
            last_activity: self.last_activity,
            retry_count: self.retry_count,
        }
    }
}

impl<H> fmt::Debug for Connection<H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Connection")
            .field("id", &self.id)
            .field("name", self.name())
            .field("connected", &self.connected)
            .field("last_activity", &self.last_activity)
            .field("retry_count", &self.retry_count)
            .finish_non_exhaustive()
    }
}

/// Health snapshot for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Whether the transport is considered live.
    pub connected: bool,
    /// Timestamp of the latest invocation attempt.
    pub last_activity: DateTime<Utc>,
    /// Failed invocations since the last success.
    pub retry_count: u32,
}
