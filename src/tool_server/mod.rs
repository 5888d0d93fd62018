//! Connection and invocation layer for out-of-process tool servers.
//!
//! The module keeps a registry of named, long-lived connections to tool
//! servers and exposes a uniform request/response surface on top of it:
//! connecting (optionally with retry), invoking tools (optionally with
//! retry), and listing the tools a server advertises. It follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Declarative server configuration in [`config`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
