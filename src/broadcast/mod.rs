//! Fan-out of messages to every open dashboard except the sender.

mod dispatcher;
mod types;

pub use dispatcher::{BroadcastDispatcher, DispatcherStatsSnapshot};
pub use types::{DeliveryReport, Origin};
