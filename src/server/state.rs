use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::BroadcastDispatcher;
use crate::config::Settings;
use crate::connection_manager::ConnectionRegistry;
use crate::detection::{EventStore, IngestionBridge};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub bridge: Arc<IngestionBridge>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn EventStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::with_concurrency(
            registry.clone(),
            settings.websocket.max_concurrent_sends,
        ));
        let bridge = Arc::new(IngestionBridge::new(store, dispatcher.clone()));

        Self {
            settings: Arc::new(settings),
            registry,
            dispatcher,
            bridge,
            started_at: Instant::now(),
        }
    }
}
