//! Port contracts for tool-server connections.

mod sleeper;
mod transport;

#[cfg(test)]
pub use sleeper::MockBackoffSleeper;
pub use sleeper::BackoffSleeper;
pub use transport::{RemoteTool, ToolServerTransport, TransportError, TransportResult};
