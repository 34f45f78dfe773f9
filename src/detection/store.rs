//! Storage abstraction for detection events.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{DetectionEvent, DetectionRecord, EventFilter, EventStatus};

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("Event {0} not found")]
    NotFound(i64),

    #[error("Unknown status code {0}")]
    InvalidStatus(i32),

    #[error("Count {count} for '{item_type}' does not fit the store")]
    InvalidCount { item_type: String, count: u32 },

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for detection events.
///
/// Events are never deleted; only their status changes.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Backend name for health and stats output
    fn backend_type(&self) -> &'static str;

    /// Persist a new event with status `Unhandled` and return it with its id.
    ///
    /// The returned event carries the camera location exactly as later reads
    /// report it.
    async fn insert(&self, record: DetectionRecord) -> Result<DetectionEvent, EventStoreError>;

    async fn get(&self, event_id: i64) -> Result<Option<DetectionEvent>, EventStoreError>;

    /// All events, newest first
    async fn list(&self) -> Result<Vec<DetectionEvent>, EventStoreError>;

    /// Events matching `filter`, newest first
    async fn list_filtered(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>, EventStoreError>;

    async fn update_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> Result<DetectionEvent, EventStoreError>;
}
