//! Adapter implementations for tool-server ports.

pub mod memory;
pub mod stdio;

mod sleeper;

pub use memory::{InMemoryHandle, InMemoryToolServerTransport};
pub use sleeper::{NoopSleeper, TokioSleeper};
pub use stdio::{StdioConnection, StdioToolServerTransport, StdioTransportSettings};
