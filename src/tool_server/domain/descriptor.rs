//! Launch parameters for a tool server.

use super::ToolServerName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and launch parameters for one tool server.
///
/// Descriptors are immutable once built. The engine keeps the descriptor a
/// connection was opened from so it can be replayed on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    name: ToolServerName,
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    description: Option<String>,
}

impl ServerDescriptor {
    /// Creates a descriptor with no arguments and no extra environment.
    ///
    /// The command is not validated; a command that cannot be launched
    /// surfaces later as a connect failure.
    #[must_use]
    pub fn new(name: ToolServerName, command: impl Into<String>) -> Self {
        Self {
            name,
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            description: None,
        }
    }

    /// Replaces the command-line arguments.
    #[must_use]
    pub fn with_args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args = values.into_iter().collect();
        self
    }

    /// Replaces the resolved environment variables.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Sets a human-readable description.
    #[must_use]
    pub fn with_description(mut self, value: impl Into<String>) -> Self {
        let normalized = value.into().trim().to_owned();
        self.description = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ToolServerName {
        &self.name
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments in order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns resolved environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
