use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub events: EventStoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Path of the dashboard upgrade endpoint
    #[serde(default = "default_ws_path")]
    pub path: String,
    /// Payload sent to a connection right after it is registered
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    /// Outbound buffer per connection
    #[serde(default = "default_channel_buffer_size")]
    pub channel_buffer_size: usize,
    /// Upper bound on in-flight sends during one broadcast
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

fn default_ws_path() -> String {
    "/websocket".to_string()
}

fn default_welcome_message() -> String {
    "success".to_string()
}

fn default_channel_buffer_size() -> usize {
    32
}

fn default_max_concurrent_sends() -> usize {
    100
}

/// Which backend stores detection events
#[derive(Debug, Clone, Deserialize)]
pub struct EventStoreConfig {
    /// "memory" (default) or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
}

fn default_store_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

fn default_database_url() -> String {
    "postgres://localhost:5432/careeyes".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300 // 5 minutes
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "cctv-alert-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Environment overrides. Sections and keys are joined by a double underscore
/// so keys that contain `_` stay intact: `SERVER__PORT`, `EVENTS__BACKEND`,
/// `DATABASE__URL`, `OTEL__SERVICE_NAME`, `WEBSOCKET__CHANNEL_BUFFER_SIZE`.
/// `SERVER__CORS_ORIGINS` takes a comma-separated list.
fn environment() -> Environment {
    Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8090)?
            .set_default("websocket.path", "/websocket")?
            .set_default("websocket.welcome_message", "success")?
            .set_default("events.backend", "memory")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment());

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            websocket: WebSocketConfig::default(),
            events: EventStoreConfig::default(),
            database: DatabaseConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            welcome_message: default_welcome_message(),
            channel_buffer_size: default_channel_buffer_size(),
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8090);
        assert!(server.cors_origins.is_empty());
    }

    #[test]
    fn test_websocket_defaults() {
        let ws = WebSocketConfig::default();
        assert_eq!(ws.path, "/websocket");
        assert_eq!(ws.welcome_message, "success");
        assert_eq!(ws.channel_buffer_size, 32);
        assert_eq!(ws.max_concurrent_sends, 100);
    }

    #[test]
    fn test_store_defaults_to_memory() {
        assert_eq!(EventStoreConfig::default().backend, "memory");
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let mut vars = config::Map::new();
        vars.insert("SERVER__PORT".to_string(), "9000".to_string());
        vars.insert(
            "SERVER__CORS_ORIGINS".to_string(),
            "http://a.local,http://b.local".to_string(),
        );
        vars.insert("OTEL__SERVICE_NAME".to_string(), "cams".to_string());
        vars.insert("WEBSOCKET__CHANNEL_BUFFER_SIZE".to_string(), "8".to_string());
        vars.insert("EVENTS__BACKEND".to_string(), "postgres".to_string());

        let settings: Settings = Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.cors_origins, vec!["http://a.local", "http://b.local"]);
        assert_eq!(settings.otel.service_name, "cams");
        assert_eq!(settings.websocket.channel_buffer_size, 8);
        assert_eq!(settings.events.backend, "postgres");
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8090");
    }
}
