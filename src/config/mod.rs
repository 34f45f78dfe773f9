mod settings;

pub use settings::{
    DatabaseConfig, EventStoreConfig, OtelConfig, ServerConfig, Settings, WebSocketConfig,
};
