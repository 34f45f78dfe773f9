//! Per-connection state machine.
//!
//! `Connecting -> Open -> Closed`. Closed is terminal: a reconnecting
//! dashboard gets a new lifecycle and a new connection id. The transport
//! layer feeds events in; this type performs the registry mutation and
//! relays inbound payloads through the dispatcher.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broadcast::{BroadcastDispatcher, DeliveryReport, Origin};
use crate::connection_manager::{ConnectionHandle, ConnectionId, ConnectionRegistry, RegistryError};
use crate::metrics::WsMetrics;

use super::OutboundMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

pub struct ConnectionLifecycle {
    id: ConnectionId,
    state: ConnectionState,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<BroadcastDispatcher>,
    handle: Option<Arc<ConnectionHandle>>,
    opened_at: Option<Instant>,
}

impl ConnectionLifecycle {
    /// Start the lifecycle of a freshly accepted transport connection
    pub fn accept(registry: Arc<ConnectionRegistry>, dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self::with_id(Uuid::new_v4(), registry, dispatcher)
    }

    pub fn with_id(
        id: ConnectionId,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<BroadcastDispatcher>,
    ) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            registry,
            dispatcher,
            handle: None,
            opened_at: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Register the connection and greet it.
    ///
    /// The welcome payload goes to this connection only. A duplicate id moves
    /// the lifecycle straight to `Closed`. Calling this outside `Connecting`
    /// does nothing.
    #[tracing::instrument(name = "ws.connect", skip(self, sender, welcome), fields(connection_id = %self.id))]
    pub async fn on_connect(
        &mut self,
        sender: mpsc::Sender<OutboundMessage>,
        welcome: OutboundMessage,
    ) -> Result<(), RegistryError> {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = ?self.state, "Connect ignored");
            return Ok(());
        }

        let handle = match self.registry.add(self.id, sender) {
            Ok(handle) => handle,
            Err(e) => {
                self.state = ConnectionState::Closed;
                WsMetrics::record_rejected();
                return Err(e);
            }
        };

        self.state = ConnectionState::Open;
        self.opened_at = Some(Instant::now());
        self.handle = Some(handle.clone());
        WsMetrics::record_opened();

        if let Err(e) = handle.send(welcome).await {
            tracing::warn!(error = %e, "Failed to send welcome message");
            self.on_close();
        }

        Ok(())
    }

    /// Relay an inbound text payload to every other open connection.
    ///
    /// Returns `None` when the connection is not open.
    pub async fn on_message(&mut self, payload: &str) -> Option<DeliveryReport> {
        if self.state != ConnectionState::Open {
            return None;
        }

        self.touch();
        WsMetrics::record_message_received();
        tracing::debug!(connection_id = %self.id, payload_len = payload.len(), "Relaying message");

        let report = self
            .dispatcher
            .broadcast(Origin::Connection(self.id), OutboundMessage::text(payload))
            .await;

        Some(report)
    }

    /// Record transport-level activity such as ping/pong frames
    pub fn touch(&self) {
        if let Some(handle) = &self.handle {
            handle.update_activity();
        }
    }

    /// Tear the connection down. Returns true if this call closed it.
    pub fn on_close(&mut self) -> bool {
        match self.state {
            ConnectionState::Closed => false,
            ConnectionState::Connecting => {
                self.state = ConnectionState::Closed;
                true
            }
            ConnectionState::Open => {
                self.registry.remove(self.id);
                self.state = ConnectionState::Closed;
                self.handle = None;

                let duration = self
                    .opened_at
                    .map(|t| t.elapsed().as_secs_f64())
                    .unwrap_or_default();
                WsMetrics::record_closed(duration);

                tracing::info!(
                    connection_id = %self.id,
                    duration_secs = duration,
                    "Dashboard connection closed"
                );
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dashboard {
        lifecycle: ConnectionLifecycle,
        rx: mpsc::Receiver<OutboundMessage>,
    }

    fn setup() -> (Arc<ConnectionRegistry>, Arc<BroadcastDispatcher>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::new(registry.clone()));
        (registry, dispatcher)
    }

    async fn open(registry: &Arc<ConnectionRegistry>, dispatcher: &Arc<BroadcastDispatcher>) -> Dashboard {
        let (tx, mut rx) = mpsc::channel(16);
        let mut lifecycle = ConnectionLifecycle::accept(registry.clone(), dispatcher.clone());
        lifecycle.on_connect(tx, "success".into()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().as_str(), "success");
        Dashboard { lifecycle, rx }
    }

    #[tokio::test]
    async fn test_connect_registers_and_greets_only_self() {
        let (registry, dispatcher) = setup();
        let mut a = open(&registry, &dispatcher).await;
        let b = open(&registry, &dispatcher).await;

        assert_eq!(a.lifecycle.state(), ConnectionState::Open);
        assert!(registry.contains(b.lifecycle.id()));
        // B's welcome must not reach A
        assert!(a.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_hello_reaches_everyone_but_sender() {
        let (registry, dispatcher) = setup();
        let mut a = open(&registry, &dispatcher).await;
        let mut b = open(&registry, &dispatcher).await;
        let mut c = open(&registry, &dispatcher).await;

        let report = a.lifecycle.on_message("hello").await.unwrap();
        assert_eq!(report.delivered, 2);

        assert_eq!(b.rx.try_recv().unwrap().as_str(), "hello");
        assert_eq!(c.rx.try_recv().unwrap().as_str(), "hello");
        assert!(b.rx.try_recv().is_err());
        assert!(c.rx.try_recv().is_err());
        assert!(a.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_removes_and_is_terminal() {
        let (registry, dispatcher) = setup();
        let mut a = open(&registry, &dispatcher).await;
        let id = a.lifecycle.id();

        assert!(a.lifecycle.on_close());
        assert_eq!(a.lifecycle.state(), ConnectionState::Closed);
        assert!(!registry.contains(id));

        // Everything after close is a no-op
        assert!(!a.lifecycle.on_close());
        assert!(a.lifecycle.on_message("late").await.is_none());
        let (tx, _rx) = mpsc::channel(1);
        a.lifecycle.on_connect(tx, "again".into()).await.unwrap();
        assert_eq!(a.lifecycle.state(), ConnectionState::Closed);
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn test_message_before_connect_is_ignored() {
        let (registry, dispatcher) = setup();
        let mut b = open(&registry, &dispatcher).await;

        let mut pending = ConnectionLifecycle::accept(registry.clone(), dispatcher.clone());
        assert_eq!(pending.state(), ConnectionState::Connecting);
        assert!(pending.on_message("too early").await.is_none());
        assert!(b.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_duplicate_id_closes_lifecycle() {
        let (registry, dispatcher) = setup();
        let id = Uuid::new_v4();

        let (tx1, _rx1) = mpsc::channel(4);
        let mut first = ConnectionLifecycle::with_id(id, registry.clone(), dispatcher.clone());
        first.on_connect(tx1, "success".into()).await.unwrap();

        let (tx2, mut rx2) = mpsc::channel(4);
        let mut second = ConnectionLifecycle::with_id(id, registry.clone(), dispatcher.clone());
        let err = second.on_connect(tx2, "success".into()).await.unwrap_err();

        assert_eq!(err, RegistryError::DuplicateConnection(id));
        assert_eq!(second.state(), ConnectionState::Closed);
        assert!(rx2.try_recv().is_err());

        // Closing the rejected lifecycle must not evict the first one
        second.on_close();
        assert!(registry.contains(id));
        assert_eq!(first.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_welcome_failure_closes_connection() {
        let (registry, dispatcher) = setup();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let mut lifecycle = ConnectionLifecycle::accept(registry.clone(), dispatcher.clone());
        lifecycle.on_connect(tx, "success".into()).await.unwrap();

        assert_eq!(lifecycle.state(), ConnectionState::Closed);
        assert!(registry.is_empty());
    }
}
