use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::broadcast::{BroadcastDispatcher, DeliveryReport, Origin};
use crate::metrics::EventMetrics;
use crate::websocket::OutboundMessage;

use super::store::{EventStore, EventStoreError};
use super::types::{DetectionEvent, EventFilter, EventStatus, NewDetection};

/// Result of ingesting one detection
#[derive(Debug)]
pub struct IngestOutcome {
    pub event: DetectionEvent,
    /// Fan-out task for the push. `None` when the event could not be
    /// serialized. Dropping the handle detaches the task.
    pub push: Option<JoinHandle<DeliveryReport>>,
}

/// Persists detection events and pushes new ones to every open dashboard.
///
/// Push is best effort and runs on its own task: `ingest` returns once the
/// event is stored, so a dashboard with a full channel cannot hold up the
/// caller.
pub struct IngestionBridge {
    store: Arc<dyn EventStore>,
    dispatcher: Arc<BroadcastDispatcher>,
}

impl IngestionBridge {
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    #[tracing::instrument(
        name = "ingest.detection",
        skip(self, detection),
        fields(cctv_id = detection.cctv_id, classes = detection.objects.len())
    )]
    pub async fn ingest(&self, detection: NewDetection) -> Result<IngestOutcome, EventStoreError> {
        let record = detection.into_record(Local::now().naive_local());
        let event = self.store.insert(record).await?;
        EventMetrics::record_ingested();

        tracing::info!(
            event_id = event.event_id,
            cctv_id = event.cctv_id,
            objects = event.total_objects(),
            "Detection event stored"
        );

        let push = match OutboundMessage::json(&event) {
            Ok(message) => {
                let dispatcher = self.dispatcher.clone();
                Some(tokio::spawn(
                    async move { dispatcher.broadcast(Origin::External, message).await }
                        .in_current_span(),
                ))
            }
            Err(e) => {
                tracing::error!(event_id = event.event_id, error = %e, "Failed to serialize event for push");
                None
            }
        };

        Ok(IngestOutcome { event, push })
    }

    /// Persist an operator's triage decision.
    ///
    /// Status changes are stored only; other dashboards pick them up on their
    /// next list fetch.
    #[tracing::instrument(name = "ingest.update_status", skip(self))]
    pub async fn update_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> Result<DetectionEvent, EventStoreError> {
        let event = self.store.update_status(event_id, status).await?;
        EventMetrics::record_status_update(status.as_str());

        tracing::info!(event_id = event_id, status = status.as_str(), "Event status updated");
        Ok(event)
    }

    pub async fn list(&self) -> Result<Vec<DetectionEvent>, EventStoreError> {
        self.store.list().await
    }

    pub async fn list_filtered(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>, EventStoreError> {
        self.store.list_filtered(filter).await
    }
}
