//! Connection management for Exasol database connections.
//!
//! This module provides connection parameter parsing, the serialized command
//! queue that owns the transport, and the lifecycle manager that opens and
//! closes it.

pub mod manager;
pub mod params;
pub mod queue;

pub use manager::ConnectionManager;
pub use params::{ConnectionBuilder, ConnectionParams};
pub use queue::{Command, CommandQueue, Reply};
