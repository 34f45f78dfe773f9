//! Connection handle and related types

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::OutboundMessage;

/// Identifier assigned to a connection when the transport accepts it
pub type ConnectionId = Uuid;

/// Handle for a single dashboard connection
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<OutboundMessage>,
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity (Unix seconds)
    last_activity: AtomicI64,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id,
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp()),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    /// Queue a message on this connection's outbound channel.
    ///
    /// Fails once the writer side of the connection has gone away.
    pub async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| DeliveryError::ChannelClosed { connection_id: self.id })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("last_activity", &self.last_activity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Errors raised by registry mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Per-recipient write failure during a broadcast
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Channel to connection {connection_id} is closed")]
    ChannelClosed { connection_id: ConnectionId },
}
