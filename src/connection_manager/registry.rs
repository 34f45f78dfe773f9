use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::OutboundMessage;

use super::stats::RegistryStats;
use super::types::{ConnectionHandle, ConnectionId, RegistryError};

/// All open dashboard connections, keyed by connection id.
///
/// Created once at startup and shared through `Arc`. Entries are inserted and
/// removed atomically, so readers never observe a partially registered
/// connection. `snapshot` copies the handles out so callers can perform
/// network writes without holding any shard lock.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection under an id chosen by the caller
    pub fn add(
        &self,
        id: ConnectionId,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<Arc<ConnectionHandle>, RegistryError> {
        match self.connections.entry(id) {
            Entry::Occupied(_) => {
                tracing::warn!(connection_id = %id, "Duplicate connection id rejected");
                Err(RegistryError::DuplicateConnection(id))
            }
            Entry::Vacant(slot) => {
                let handle = Arc::new(ConnectionHandle::new(id, sender));
                slot.insert(handle.clone());
                tracing::info!(connection_id = %id, "Connection registered");
                Ok(handle)
            }
        }
    }

    /// Register a connection under a freshly generated id
    pub fn register(
        &self,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<Arc<ConnectionHandle>, RegistryError> {
        self.add(Uuid::new_v4(), sender)
    }

    /// Remove a connection. Returns false if it was not registered.
    pub fn remove(&self, id: ConnectionId) -> bool {
        match self.connections.remove(&id) {
            Some(_) => {
                tracing::info!(connection_id = %id, "Connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the registered connections
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let now = Utc::now();
        let oldest = self
            .connections
            .iter()
            .map(|r| r.value().connected_at)
            .min()
            .map(|t| now.signed_duration_since(t).num_seconds());

        RegistryStats {
            total_connections: self.connections.len(),
            oldest_connection_secs: oldest,
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio_test::assert_ok;

    fn channel() -> (mpsc::Sender<OutboundMessage>, mpsc::Receiver<OutboundMessage>) {
        mpsc::channel(8)
    }

    #[test]
    fn test_add_and_snapshot() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();

        let a = assert_ok!(registry.register(tx_a));
        let b = assert_ok!(registry.register(tx_b));

        let ids: HashSet<_> = registry.snapshot().iter().map(|h| h.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        assert_ok!(registry.add(id, tx1));
        let err = registry.add(id, tx2).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateConnection(id));

        // The first channel is still the registered one
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let handle = registry.register(tx).unwrap();

        assert!(registry.remove(handle.id));
        assert!(!registry.remove(handle.id));
        assert!(!registry.remove(handle.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        registry.register(tx).unwrap();

        assert!(!registry.remove(Uuid::new_v4()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutation() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = channel();
        let a = registry.register(tx_a).unwrap();

        let snapshot = registry.snapshot();

        registry.remove(a.id);
        let (tx_b, _rx_b) = channel();
        registry.register(tx_b).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, a.id);
    }

    #[test]
    fn test_interleaved_add_remove_snapshot() {
        let registry = ConnectionRegistry::new();
        let mut live = HashSet::new();
        let mut receivers = Vec::new();

        for round in 0..50 {
            let (tx, rx) = channel();
            receivers.push(rx);
            let handle = registry.register(tx).unwrap();
            live.insert(handle.id);

            if round % 3 == 0 {
                let victim = *live.iter().next().unwrap();
                registry.remove(victim);
                live.remove(&victim);
            }

            let snapshot = registry.snapshot();
            let ids: HashSet<_> = snapshot.iter().map(|h| h.id).collect();
            assert_eq!(ids.len(), snapshot.len(), "duplicate id in snapshot");
            assert_eq!(ids, live);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutation_keeps_ids_unique() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for _ in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let (tx, _rx) = mpsc::channel(1);
                    let handle = registry.register(tx).unwrap();
                    let snapshot = registry.snapshot();
                    let unique: HashSet<_> = snapshot.iter().map(|h| h.id).collect();
                    assert_eq!(unique.len(), snapshot.len());
                    registry.remove(handle.id);
                    tokio::task::yield_now().await;
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert!(registry.is_empty());
    }

    #[test]
    fn test_stats() {
        let registry = ConnectionRegistry::new();
        assert!(registry.stats().oldest_connection_secs.is_none());

        let (tx, _rx) = channel();
        registry.register(tx).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total_connections, 1);
        assert!(stats.oldest_connection_secs.unwrap() >= 0);
    }
}
