//! Detection event endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::detection::{DetectionEvent, EventFilter, EventStatus, NewDetection};
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: i32,
}

/// POST /api/ai/detect - store a detection and push it to dashboards
#[tracing::instrument(
    name = "http.ingest_detection",
    skip(state, detection),
    fields(cctv_id = detection.cctv_id)
)]
pub async fn ingest_detection(
    State(state): State<AppState>,
    Json(detection): Json<NewDetection>,
) -> Result<Json<DetectionEvent>> {
    detection.validate().map_err(AppError::Validation)?;

    let outcome = state.bridge.ingest(detection).await?;
    Ok(Json(outcome.event))
}

/// GET /api/eventlist
pub async fn event_list(State(state): State<AppState>) -> Result<Json<Vec<DetectionEvent>>> {
    Ok(Json(state.bridge.list().await?))
}

/// GET /api/filteredeventlist?type=&from=&to=&manage=
#[tracing::instrument(name = "http.filtered_event_list", skip(state))]
pub async fn filtered_event_list(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<DetectionEvent>>> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::Validation(format!(
                "'from' ({}) is after 'to' ({})",
                from, to
            )));
        }
    }

    Ok(Json(state.bridge.list_filtered(&filter).await?))
}

/// PATCH /api/event/{id}/status
#[tracing::instrument(name = "http.update_event_status", skip(state))]
pub async fn update_event_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<DetectionEvent>> {
    let status = EventStatus::try_from(request.status).map_err(AppError::Validation)?;

    let event = state.bridge.update_status(id, status).await?;
    Ok(Json(event))
}
