//! Detection events: model, persistence, and the ingestion bridge that
//! pushes newly stored events to dashboards.

mod bridge;
mod memory_store;
mod postgres_store;
mod store;
mod types;

use std::sync::Arc;

use crate::config::Settings;

pub use bridge::{IngestOutcome, IngestionBridge};
pub use memory_store::MemoryEventStore;
pub use postgres_store::PostgresEventStore;
pub use store::{EventStore, EventStoreError};
pub use types::{
    DetectionEvent, DetectionRecord, EventFilter, EventStatus, NewDetection, MAX_OBJECT_COUNT,
};

/// Create the event store selected by `events.backend`.
///
/// - `"postgres"`: connects using `database.*` and creates the schema if needed
/// - anything else: in-memory store
pub async fn create_event_store(settings: &Settings) -> Result<Arc<dyn EventStore>, EventStoreError> {
    match settings.events.backend.as_str() {
        "postgres" => {
            let pool = postgres_store::connect(&settings.database).await?;
            let store = PostgresEventStore::new(pool);
            store.ensure_schema().await?;
            tracing::info!(backend = "postgres", "Event store ready");
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Event store ready");
            Ok(Arc::new(MemoryEventStore::new()))
        }
        other => {
            tracing::warn!(backend = %other, "Unknown event store backend, falling back to memory");
            Ok(Arc::new(MemoryEventStore::new()))
        }
    }
}
