//! Shared fixtures for in-memory tool-server integration tests.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use rstest::fixture;
use switchboard::tool_server::{
    adapters::{InMemoryToolServerTransport, NoopSleeper},
    domain::{RetryPolicy, ServerDescriptor, ToolServerName},
    services::ToolInvocationService,
};

/// Service type exercised by the in-memory suites.
pub type TestService = ToolInvocationService<InMemoryToolServerTransport, DefaultClock, NoopSleeper>;

/// Transport and service wired together for one test.
pub struct TestContext {
    pub transport: Arc<InMemoryToolServerTransport>,
    pub service: TestService,
}

/// Builds a context whose service retries `max_retries` times without
/// sleeping.
pub fn context_with_retries(max_retries: u32) -> TestContext {
    let transport = Arc::new(InMemoryToolServerTransport::new());
    let policy = RetryPolicy::new(
        max_retries,
        Duration::from_millis(10),
        Duration::from_millis(100),
        2.0,
    )
    .expect("valid retry policy");
    let service = ToolInvocationService::new(
        transport.clone(),
        Arc::new(DefaultClock),
        Arc::new(NoopSleeper),
    )
    .with_retry_policy(policy);
    TestContext { transport, service }
}

/// Provides a context retrying up to three times.
#[fixture]
pub fn context() -> TestContext {
    context_with_retries(3)
}

/// Parses a server name known to be valid.
pub fn server(name: &str) -> ToolServerName {
    ToolServerName::new(name).expect("valid server name")
}

/// Builds a descriptor launching `<name>-mcp`.
pub fn descriptor(name: &str) -> ServerDescriptor {
    ServerDescriptor::new(server(name), format!("{name}-mcp"))
}
