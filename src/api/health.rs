//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::broadcast::DispatcherStatsSnapshot;
use crate::connection_manager::RegistryStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: usize,
    pub event_store: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: RegistryStats,
    pub broadcasts: DispatcherStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        connections: state.registry.len(),
        event_store: state.bridge.store().backend_type().to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.registry.stats(),
        broadcasts: state.dispatcher.stats(),
    })
}
