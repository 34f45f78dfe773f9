//! Registry of live dashboard connections.
//!
//! This module provides:
//! - Connection handles wrapping the per-connection outbound channel
//! - The shared registry used by the lifecycle handler and the dispatcher
//! - Registry statistics

mod registry;
mod stats;
mod types;

pub use registry::ConnectionRegistry;
pub use stats::RegistryStats;
pub use types::{ConnectionHandle, ConnectionId, DeliveryError, RegistryError};
