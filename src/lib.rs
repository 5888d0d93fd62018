//! Switchboard: connection and invocation layer for external tool servers.
//!
//! This crate manages long-lived connections to out-of-process tool servers
//! that speak the Model Context Protocol over stdio, and exposes a uniform
//! request/response surface for invoking their tools and discovering what
//! they offer.
//!
//! # Architecture
//!
//! Switchboard follows hexagonal architecture principles:
//!
//! - **Domain**: Server identity, connection bookkeeping, retry policy, and
//!   failure classification with no process or I/O dependencies
//! - **Ports**: Abstract trait interfaces for transports and backoff sleeping
//! - **Adapters**: Concrete implementations of ports (stdio processes,
//!   in-memory test doubles, Tokio timers)
//!
//! # Modules
//!
//! - [`tool_server`]: Configuration, connection registry, and invocation
//!   service

pub mod tool_server;
