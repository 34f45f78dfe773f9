//! In-memory event store using DashMap.
//!
//! Events are lost on restart. Used by default and in tests. Camera locations
//! are resolved on every read, like the `cctv` join of the PostgreSQL store.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{EventStore, EventStoreError};
use super::types::{DetectionEvent, DetectionRecord, EventFilter, EventStatus};

pub struct MemoryEventStore {
    events: DashMap<i64, DetectionEvent>,
    cameras: DashMap<i64, String>,
    next_id: AtomicI64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            cameras: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Record where a camera is mounted
    pub fn register_camera(&self, cctv_id: i64, location: impl Into<String>) {
        self.cameras.insert(cctv_id, location.into());
    }

    fn with_location(&self, mut event: DetectionEvent) -> DetectionEvent {
        event.location = self.cameras.get(&event.cctv_id).map(|l| l.value().clone());
        event
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<DetectionEvent>
    where
        F: Fn(&DetectionEvent) -> bool,
    {
        let mut events: Vec<DetectionEvent> = self
            .events
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| self.with_location(e.value().clone()))
            .collect();
        events.sort_by_key(|e| Reverse((e.occurred_at(), e.event_id)));
        events
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: DetectionRecord) -> Result<DetectionEvent, EventStoreError> {
        let event_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event = record.into_event(event_id, None);
        self.events.insert(event_id, event.clone());

        tracing::trace!(event_id = event_id, "Event stored in memory");
        Ok(self.with_location(event))
    }

    async fn get(&self, event_id: i64) -> Result<Option<DetectionEvent>, EventStoreError> {
        let event = self.events.get(&event_id).map(|e| e.value().clone());
        Ok(event.map(|e| self.with_location(e)))
    }

    async fn list(&self) -> Result<Vec<DetectionEvent>, EventStoreError> {
        Ok(self.collect_sorted(|_| true))
    }

    async fn list_filtered(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>, EventStoreError> {
        Ok(self.collect_sorted(|e| filter.matches(e)))
    }

    async fn update_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> Result<DetectionEvent, EventStoreError> {
        let mut entry = self
            .events
            .get_mut(&event_id)
            .ok_or(EventStoreError::NotFound(event_id))?;
        entry.manage = status;
        let event = entry.value().clone();
        drop(entry);
        Ok(self.with_location(event))
    }
}
