//! Registry statistics

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_connections: usize,
    /// Age in seconds of the longest-lived connection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_connection_secs: Option<i64>,
}
