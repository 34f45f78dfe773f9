use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::server::AppState;

use super::events::{event_list, filtered_event_list, ingest_detection, update_event_status};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Detection events
        .nest(
            "/api",
            Router::new()
                .route("/ai/detect", post(ingest_detection))
                .route("/eventlist", get(event_list))
                .route("/filteredeventlist", get(filtered_event_list))
                .route("/event/{id}/status", patch(update_event_status)),
        )
}
