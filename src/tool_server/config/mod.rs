//! Declarative tool-server configuration.
//!
//! A configuration document is a JSON object whose `mcpServers` field (also
//! accepted as `servers`) maps server names to launch parameters:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "github": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-github"],
//!       "env": { "GITHUB_TOKEN": "${GITHUB_TOKEN}" },
//!       "description": "GitHub issues and pull requests"
//!     },
//!     "browser": { "command": "browser-mcp", "disabled": true }
//!   },
//!   "retry": { "maxRetries": 3, "initialDelayMs": 1000, "maxDelayMs": 30000 }
//! }
//! ```
//!
//! Disabled entries are dropped, `${NAME}` placeholders in env values are
//! resolved against the process environment, and servers are returned in name
//! order. Keys are trimmed and otherwise used as written; an entry whose key is
//! blank or overlong is logged and skipped without failing its siblings.

mod placeholders;

use crate::tool_server::domain::{
    RetryPolicy, ServerDescriptor, ToolServerDomainError, ToolServerName,
};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Errors returned while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read tool server config {path}: {source}")]
    Read {
        /// Path that was requested.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The document is not valid JSON of the expected shape.
    #[error("failed to parse tool server config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two server keys name the same server once surrounding whitespace is
    /// trimmed.
    #[error("duplicate tool server entry '{name}'")]
    DuplicateServer {
        /// Trimmed server name shared by both keys.
        name: String,
    },

    /// The retry section describes an invalid policy.
    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(#[source] ToolServerDomainError),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fully resolved configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolServerConfig {
    /// Enabled servers in name order.
    pub servers: Vec<ServerDescriptor>,
    /// Retry policy from the `retry` section, or the default.
    pub retry_policy: RetryPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigDocument {
    #[serde(default, alias = "servers")]
    mcp_servers: BTreeMap<String, ServerEntry>,
    #[serde(default)]
    retry: Option<RetrySection>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrySection {
    max_retries: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
}

impl RetrySection {
    fn into_policy(self) -> ConfigResult<RetryPolicy> {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            self.max_retries.unwrap_or_else(|| defaults.max_retries()),
            self.initial_delay_ms
                .map_or_else(|| defaults.initial_delay(), Duration::from_millis),
            self.max_delay_ms
                .map_or_else(|| defaults.max_delay(), Duration::from_millis),
            self.backoff_multiplier
                .unwrap_or_else(|| defaults.backoff_multiplier()),
        )
        .map_err(ConfigError::InvalidRetryPolicy)
    }
}

/// Reads and resolves the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read, and any error
/// documented on [`parse_config`].
pub fn load_config(path: &Utf8Path) -> ConfigResult<ToolServerConfig> {
    let source = read_config_file(path)?;
    parse_config(&source)
}

/// Reads the configuration file at `path` and returns its enabled servers.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_configs(path: &Utf8Path) -> ConfigResult<Vec<ServerDescriptor>> {
    load_config(path).map(|config| config.servers)
}

/// Parses a configuration document, resolving placeholders from the process
/// environment.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed documents,
/// [`ConfigError::DuplicateServer`] when two keys trim to the same name, and
/// [`ConfigError::InvalidRetryPolicy`] for an invalid `retry` section.
pub fn parse_config(source: &str) -> ConfigResult<ToolServerConfig> {
    parse_config_with(source, |name| env::var(name).ok())
}

/// Parses a configuration document and returns its enabled servers.
///
/// # Errors
///
/// See [`parse_config`].
pub fn parse_configs(source: &str) -> ConfigResult<Vec<ServerDescriptor>> {
    parse_config(source).map(|config| config.servers)
}

/// Parses a configuration document and returns its enabled servers,
/// resolving placeholders through `lookup`.
///
/// # Errors
///
/// See [`parse_config`].
pub fn parse_configs_with(
    source: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<Vec<ServerDescriptor>> {
    parse_config_with(source, lookup).map(|config| config.servers)
}

/// Parses a configuration document, resolving placeholders through `lookup`.
///
/// # Errors
///
/// See [`parse_config`].
pub fn parse_config_with(
    source: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<ToolServerConfig> {
    let document: ConfigDocument = serde_json::from_str(source)?;

    let retry_policy = document
        .retry
        .map_or_else(|| Ok(RetryPolicy::default()), RetrySection::into_policy)?;

    let mut seen = BTreeSet::new();
    let mut servers = Vec::with_capacity(document.mcp_servers.len());
    for (key, entry) in document.mcp_servers {
        let name = match ToolServerName::new(key.as_str()) {
            Ok(name) => name,
            Err(error) => {
                warn!(server = %key, %error, "skipping tool server with invalid name");
                continue;
            }
        };
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateServer {
                name: name.into(),
            });
        }
        if entry.disabled {
            debug!(server = %name, "skipping disabled tool server");
            continue;
        }
        servers.push(resolve_entry(name, entry, &lookup));
    }
    servers.sort_by(|left, right| left.name().cmp(right.name()));

    Ok(ToolServerConfig {
        servers,
        retry_policy,
    })
}

fn resolve_entry(
    name: ToolServerName,
    entry: ServerEntry,
    lookup: &impl Fn(&str) -> Option<String>,
) -> ServerDescriptor {
    let env = entry
        .env
        .into_iter()
        .map(|(variable, value)| {
            let resolved = placeholders::expand(&value, lookup);
            (variable, resolved)
        });

    let descriptor = ServerDescriptor::new(name, entry.command)
        .with_args(entry.args)
        .with_env(env);
    match entry.description {
        Some(description) => descriptor.with_description(description),
        None => descriptor,
    }
}

fn read_config_file(path: &Utf8Path) -> ConfigResult<String> {
    let read_error = |source| ConfigError::Read {
        path: path.to_string(),
        source,
    };

    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path does not name a file",
        ))
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    dir.read_to_string(file_name).map_err(read_error)
}
