use serde::Serialize;

use crate::connection_manager::ConnectionId;

/// Where a broadcast message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Relayed from a dashboard; that connection is skipped
    Connection(ConnectionId),
    /// Produced outside any connection (event ingestion); nobody is skipped
    External,
}

impl Origin {
    /// Whether `id` must not receive a message with this origin
    pub fn excludes(&self, id: ConnectionId) -> bool {
        matches!(self, Origin::Connection(origin) if *origin == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Origin::Connection(_) => "connection",
            Origin::External => "external",
        }
    }
}

/// Outcome of one broadcast call
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    /// Recipients whose channel accepted the message
    pub delivered: usize,
    /// Recipients whose channel was closed
    pub failed: usize,
    /// Connections this call removed from the registry
    pub removed: Vec<ConnectionId>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}
