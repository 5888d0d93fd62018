//! Connects to every configured tool server and prints the tool catalogue.
//!
//! Usage:
//!
//! ```text
//! tool_catalog <config-path>
//! ```
//!
//! The file at `config-path` uses the `mcpServers` layout understood by
//! [`switchboard::tool_server::config`]. Enabled servers are connected with
//! the configured retry policy, their tools are listed, and the result is
//! written to stdout as JSON keyed by server name:
//!
//! ```json
//! {
//!   "github": {
//!     "connected": true,
//!     "tools": [{ "name": "search_issues", "description": "Search issues" }]
//!   },
//!   "browser": {
//!     "connected": false,
//!     "error": "failed to connect to browser after 4 attempts: ...",
//!     "tools": []
//!   }
//! }
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the default `info` filter.

use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use switchboard::tool_server::{
    adapters::{StdioToolServerTransport, TokioSleeper},
    config::{ConfigError, load_config},
    domain::{ToolDescriptor, ToolServerName},
    services::{ConnectResult, ToolInvocationService},
};
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building the catalogue.
#[derive(Debug, Error)]
enum CatalogError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] io::Error),
    #[error("failed to write catalogue: {0}")]
    Output(#[source] serde_json::Error),
}

/// Catalogue entry for one configured server.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct CatalogEntry {
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    tools: Vec<ToolDescriptor>,
}

fn main() -> Result<(), BoxError> {
    init_tracing();
    let config_path = parse_args(env::args())?;
    run(&config_path).map_err(Into::into)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Utf8PathBuf, CatalogError> {
    let _program = args.next();
    let config_path = args
        .next()
        .ok_or_else(|| CatalogError::InvalidArgs("missing config path argument".into()))?;
    if let Some(extra) = args.next() {
        return Err(CatalogError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok(Utf8PathBuf::from(config_path))
}

fn run(config_path: &Utf8Path) -> Result<(), CatalogError> {
    let config = load_config(config_path)?;
    info!(
        path = %config_path,
        servers = config.servers.len(),
        "loaded tool server config"
    );

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CatalogError::RuntimeInit)?;

    let catalogue = runtime.block_on(async {
        let service = ToolInvocationService::new(
            Arc::new(StdioToolServerTransport::new()),
            Arc::new(DefaultClock),
            Arc::new(TokioSleeper),
        )
        .with_retry_policy(config.retry_policy);

        let connections = service.connect_all(config.servers).await;
        let mut tools = service.list_all_tools().await;
        service.disconnect_all().await;

        build_catalogue(connections, &mut tools)
    });

    write_catalogue(io::stdout().lock(), &catalogue)
}

fn build_catalogue(
    connections: BTreeMap<ToolServerName, ConnectResult<()>>,
    tools: &mut BTreeMap<ToolServerName, Vec<ToolDescriptor>>,
) -> BTreeMap<ToolServerName, CatalogEntry> {
    connections
        .into_iter()
        .map(|(name, result)| {
            let entry = CatalogEntry {
                connected: result.is_ok(),
                error: result.err().map(|err| err.to_string()),
                tools: tools.remove(&name).unwrap_or_default(),
            };
            (name, entry)
        })
        .collect()
}

fn write_catalogue(
    mut writer: impl Write,
    catalogue: &BTreeMap<ToolServerName, CatalogEntry>,
) -> Result<(), CatalogError> {
    serde_json::to_writer_pretty(&mut writer, catalogue).map_err(CatalogError::Output)?;
    writeln!(writer).map_err(|err| CatalogError::Output(serde_json::Error::io(err)))
}
