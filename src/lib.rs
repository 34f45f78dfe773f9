// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Real-time fan-out
pub mod broadcast;
pub mod connection_manager;
pub mod websocket;

// Detection events
pub mod detection;

// Application layer
pub mod api;
pub mod server;
