use std::time::Instant;

use serde::Serialize;

use crate::db::Connection;

/// Outcome of a single ping against the replica set.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Error details when the ping failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

pub async fn check_health(connection: &Connection) -> HealthStatus {
    let start = Instant::now();
    let result = connection.ping().await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}
