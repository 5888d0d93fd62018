//! Application services for tool-server connections.

mod invocation;
mod registry;

pub use invocation::{ConnectError, ConnectResult, ToolInvocationService};
pub use registry::{ConnectionRegistry, Replaced};
