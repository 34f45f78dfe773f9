//! API layer - HTTP endpoint handlers.

mod events;
mod health;
mod metrics;
mod routes;

pub use events::{event_list, filtered_event_list, ingest_detection, update_event_status, StatusUpdateRequest};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
