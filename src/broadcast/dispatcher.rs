use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::connection_manager::{ConnectionHandle, ConnectionId, ConnectionRegistry, DeliveryError};
use crate::metrics::BroadcastMetrics;
use crate::websocket::OutboundMessage;

use super::{DeliveryReport, Origin};

/// Default bound on in-flight sends for one broadcast
const DEFAULT_MAX_CONCURRENT_SENDS: usize = 100;

/// Counters for the dispatcher
#[derive(Debug, Default)]
struct DispatcherStats {
    total_broadcasts: AtomicU64,
    relay_broadcasts: AtomicU64,
    external_broadcasts: AtomicU64,
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
    total_pruned: AtomicU64,
}

impl DispatcherStats {
    fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_broadcasts: self.total_broadcasts.load(Ordering::Relaxed),
            relay_broadcasts: self.relay_broadcasts.load(Ordering::Relaxed),
            external_broadcasts: self.external_broadcasts.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_pruned: self.total_pruned.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_broadcasts: u64,
    pub relay_broadcasts: u64,
    pub external_broadcasts: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_pruned: u64,
}

/// Delivers messages to every registered connection except the origin.
///
/// A recipient whose channel is closed is removed from the registry and the
/// remaining recipients are still served. Failures never reach the caller.
pub struct BroadcastDispatcher {
    registry: Arc<ConnectionRegistry>,
    max_concurrent_sends: usize,
    stats: DispatcherStats,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_concurrency(registry, DEFAULT_MAX_CONCURRENT_SENDS)
    }

    pub fn with_concurrency(registry: Arc<ConnectionRegistry>, max_concurrent_sends: usize) -> Self {
        Self {
            registry,
            max_concurrent_sends: max_concurrent_sends.max(1),
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send `message` to every open connection that `origin` does not exclude.
    ///
    /// Returns once every attempt has completed.
    #[tracing::instrument(
        name = "dispatcher.broadcast",
        skip(self, message),
        fields(origin = origin.label(), payload_len = message.len())
    )]
    pub async fn broadcast(&self, origin: Origin, message: OutboundMessage) -> DeliveryReport {
        let started = Instant::now();

        let recipients: Vec<Arc<ConnectionHandle>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|conn| !origin.excludes(conn.id))
            .collect();

        let report = self.send_to_connections(&recipients, &message).await;

        self.record(origin, &report);
        BroadcastMetrics::observe_latency(started.elapsed().as_secs_f64());

        tracing::debug!(
            recipients = recipients.len(),
            delivered = report.delivered,
            failed = report.failed,
            removed = report.removed.len(),
            "Broadcast complete"
        );

        report
    }

    /// Send concurrently with bounded parallelism, handling each outcome as it lands
    async fn send_to_connections(
        &self,
        connections: &[Arc<ConnectionHandle>],
        message: &OutboundMessage,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if connections.is_empty() {
            return report;
        }

        let mut futures = FuturesUnordered::new();

        for conn in connections {
            let conn = conn.clone();
            let msg = message.clone();
            futures.push(async move {
                let result = conn.send(msg).await;
                (conn.id, result)
            });

            while futures.len() >= self.max_concurrent_sends {
                match futures.next().await {
                    Some((id, result)) => self.handle_outcome(id, result, &mut report),
                    None => break,
                }
            }
        }

        while let Some((id, result)) = futures.next().await {
            self.handle_outcome(id, result, &mut report);
        }

        report
    }

    fn handle_outcome(
        &self,
        id: ConnectionId,
        result: Result<(), DeliveryError>,
        report: &mut DeliveryReport,
    ) {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(connection_id = %id, error = %e, "Delivery failed, dropping connection");
                if self.registry.remove(id) {
                    report.removed.push(id);
                }
            }
        }
    }

    fn record(&self, origin: Origin, report: &DeliveryReport) {
        self.stats.total_broadcasts.fetch_add(1, Ordering::Relaxed);
        match origin {
            Origin::Connection(_) => {
                self.stats.relay_broadcasts.fetch_add(1, Ordering::Relaxed);
                BroadcastMetrics::record_relay();
            }
            Origin::External => {
                self.stats.external_broadcasts.fetch_add(1, Ordering::Relaxed);
                BroadcastMetrics::record_external();
            }
        }
        self.stats
            .total_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.stats
            .total_pruned
            .fetch_add(report.removed.len() as u64, Ordering::Relaxed);

        BroadcastMetrics::record_delivered(report.delivered as u64);
        BroadcastMetrics::record_failed(report.failed as u64);
        BroadcastMetrics::record_pruned(report.removed.len() as u64);
    }
}
