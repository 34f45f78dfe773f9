//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BROADCASTS_TOTAL, BROADCAST_LATENCY, CONNECTIONS_PRUNED_TOTAL, EVENTS_INGESTED_TOTAL,
    EVENT_STATUS_UPDATES_TOTAL, MESSAGES_DELIVERED_TOTAL, MESSAGES_FAILED_TOTAL,
    WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTIONS_REJECTED,
    WS_CONNECTION_DURATION, WS_MESSAGES_RECEIVED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording broadcast metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record a broadcast relayed from a dashboard connection
    pub fn record_relay() {
        BROADCASTS_TOTAL.with_label_values(&["connection"]).inc();
    }

    /// Record a broadcast pushed by the ingestion path
    pub fn record_external() {
        BROADCASTS_TOTAL.with_label_values(&["external"]).inc();
    }

    pub fn record_delivered(count: u64) {
        MESSAGES_DELIVERED_TOTAL.inc_by(count);
    }

    pub fn record_failed(count: u64) {
        MESSAGES_FAILED_TOTAL.inc_by(count);
    }

    pub fn record_pruned(count: u64) {
        CONNECTIONS_PRUNED_TOTAL.inc_by(count);
    }

    pub fn observe_latency(seconds: f64) {
        BROADCAST_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording WebSocket lifecycle metrics
pub struct WsMetrics;

impl WsMetrics {
    pub fn record_opened() {
        WS_CONNECTIONS_OPENED.inc();
    }

    pub fn record_closed(duration_secs: f64) {
        WS_CONNECTIONS_CLOSED.inc();
        WS_CONNECTION_DURATION.observe(duration_secs);
    }

    pub fn record_rejected() {
        WS_CONNECTIONS_REJECTED.inc();
    }

    pub fn record_message_received() {
        WS_MESSAGES_RECEIVED.inc();
    }
}

/// Helper struct for recording detection event metrics
pub struct EventMetrics;

impl EventMetrics {
    pub fn record_ingested() {
        EVENTS_INGESTED_TOTAL.inc();
    }

    pub fn record_status_update(status: &str) {
        EVENT_STATUS_UPDATES_TOTAL.with_label_values(&[status]).inc();
    }
}
