//! Prometheus metrics for the alert service.
//!
//! - Connection metrics (open dashboards, connection lifetime)
//! - Broadcast metrics (fan-outs by origin, deliveries, failures, pruned peers)
//! - Detection event metrics (ingested events, status changes)

mod helpers;

pub use helpers::{encode_metrics, BroadcastMetrics, EventMetrics, WsMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "careeyes";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Number of dashboard connections currently registered
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Number of open dashboard WebSocket connections"
    ).unwrap();

    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Connections refused at registration time
    pub static ref WS_CONNECTIONS_REJECTED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_rejected_total", METRIC_PREFIX),
        "Total WebSocket connections rejected during registration"
    ).unwrap();

    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "Lifetime of dashboard connections in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0, 86400.0]
    ).unwrap();

    /// Inbound text frames relayed from dashboards
    pub static ref WS_MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        format!("{}_ws_messages_received_total", METRIC_PREFIX),
        "Total text frames received from dashboards"
    ).unwrap();

    // ============================================================================
    // Broadcast Metrics
    // ============================================================================

    /// Broadcasts by origin ("connection" for relays, "external" for ingestion)
    pub static ref BROADCASTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Total broadcasts by origin",
        &["origin"]
    ).unwrap();

    pub static ref MESSAGES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_delivered_total", METRIC_PREFIX),
        "Total messages handed to a recipient connection"
    ).unwrap();

    pub static ref MESSAGES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_failed_total", METRIC_PREFIX),
        "Total per-recipient delivery failures"
    ).unwrap();

    /// Connections removed by the dispatcher after a failed write
    pub static ref CONNECTIONS_PRUNED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_connections_pruned_total", METRIC_PREFIX),
        "Total connections removed after a delivery failure"
    ).unwrap();

    pub static ref BROADCAST_LATENCY: Histogram = register_histogram!(
        format!("{}_broadcast_latency_seconds", METRIC_PREFIX),
        "Time to complete one broadcast fan-out in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Detection Event Metrics
    // ============================================================================

    pub static ref EVENTS_INGESTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_ingested_total", METRIC_PREFIX),
        "Total detection events persisted"
    ).unwrap();

    /// Status changes by target status
    pub static ref EVENT_STATUS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_event_status_updates_total", METRIC_PREFIX),
        "Total detection event status changes",
        &["status"]
    ).unwrap();
}
