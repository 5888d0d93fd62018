//! Identifier and validated-name types for tool-server connections.

use super::ToolServerDomainError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Maximum length for a tool server name.
const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Unique identifier for one established connection.
///
/// Every successful connect mints a fresh identifier, so a reconnect under the
/// same server name is distinguishable from the connection it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated tool server name, the registry's primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolServerName(String);

impl ToolServerName {
    /// Creates a validated tool server name.
    ///
    /// The input is trimmed and otherwise kept as written, so configuration
    /// keys such as `github` or `brave search` are both valid.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerDomainError`] when the trimmed name is empty or
    /// longer than 100 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ToolServerDomainError> {
        let normalized = value.into().trim().to_owned();

        if normalized.is_empty() {
            return Err(ToolServerDomainError::EmptyServerName);
        }

        if normalized.chars().count() > MAX_SERVER_NAME_LENGTH {
            return Err(ToolServerDomainError::ServerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ToolServerName {
    type Error = ToolServerDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ToolServerName> for String {
    fn from(value: ToolServerName) -> Self {
        value.0
    }
}

impl AsRef<str> for ToolServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ToolServerName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ToolServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
