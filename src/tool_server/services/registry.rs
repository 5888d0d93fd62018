//! Registry of live tool-server connections keyed by server name.

use crate::tool_server::domain::{Connection, ConnectionId, ConnectionStats, ToolServerName};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of [`ConnectionRegistry::replace`].
#[derive(Debug)]
pub enum Replaced<H> {
    /// The expected entry was swapped out and is returned for closing.
    Previous(Connection<H>),
    /// The entry changed in the meantime; the offered connection is handed
    /// back unregistered.
    Rejected(Connection<H>),
}

/// Thread-safe map of connections, at most one per server name.
///
/// Every operation holds the lock only for the map access itself, so no
/// caller ever waits on another caller's network round trip.
#[derive(Debug)]
pub struct ConnectionRegistry<H> {
    connections: Mutex<BTreeMap<ToolServerName, Connection<H>>>,
}

impl<H> Default for ConnectionRegistry<H> {
    fn default() -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<H> ConnectionRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn connections(&self) -> MutexGuard<'_, BTreeMap<ToolServerName, Connection<H>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of the connection registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Connection<H>> {
        self.connections().get(name).cloned()
    }

    /// Inserts a connection, returning the entry it replaced.
    ///
    /// The caller owns the replaced entry and must release its handle.
    #[must_use = "a replaced connection must be closed"]
    pub fn put(&self, connection: Connection<H>) -> Option<Connection<H>> {
        self.connections()
            .insert(connection.name().clone(), connection)
    }

    /// Swaps in `connection` if the entry under its name is still the one
    /// identified by `expected_id`.
    #[must_use = "the returned connection must be closed"]
    pub fn replace(&self, expected_id: ConnectionId, connection: Connection<H>) -> Replaced<H> {
        let mut connections = self.connections();
        match connections.get_mut(connection.name().as_str()) {
            Some(current) if current.id() == expected_id => {
                Replaced::Previous(std::mem::replace(current, connection))
            }
            _ => Replaced::Rejected(connection),
        }
    }

    /// Removes the connection registered under `name`, if any.
    #[must_use = "a removed connection must be closed"]
    pub fn remove(&self, name: &str) -> Option<Connection<H>> {
        self.connections().remove(name)
    }

    /// Applies `update` to the entry for `name` if it is still the connection
    /// identified by `connection_id`.
    ///
    /// Returns `false` when the entry is gone or was replaced by a reconnect
    /// in the meantime.
    #[must_use]
    pub fn update(
        &self,
        name: &str,
        connection_id: ConnectionId,
        update: impl FnOnce(&mut Connection<H>),
    ) -> bool {
        let mut connections = self.connections();
        match connections.get_mut(name) {
            Some(connection) if connection.id() == connection_id => {
                update(connection);
                true
            }
            _ => false,
        }
    }

    /// Returns the names of connected entries in name order.
    #[must_use]
    pub fn list_connected(&self) -> Vec<ToolServerName> {
        self.connections()
            .values()
            .filter(|connection| connection.is_connected())
            .map(|connection| connection.name().clone())
            .collect()
    }

    /// Returns every registered name, connected or not, in name order.
    #[must_use]
    pub fn names(&self) -> Vec<ToolServerName> {
        self.connections().keys().cloned().collect()
    }

    /// Returns a health snapshot for every entry.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<ToolServerName, ConnectionStats> {
        self.connections()
            .iter()
            .map(|(name, connection)| (name.clone(), connection.stats()))
            .collect()
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections().len()
    }

    /// Returns `true` when no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections().is_empty()
    }
}
