//! `/health` endpoint: liveness plus a snapshot of what the relay holds.

use crate::server::ConnectRelay;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Always `"ok"` while the process answers.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Seconds since the relay was created.
    pub uptime_seconds: u64,
    /// Devices with a room binding.
    pub devices: usize,
    /// Live room logs.
    pub rooms: usize,
    /// Entries across all live rooms. Bridged history is counted once per room
    /// holding a copy.
    pub entries: usize,
    /// File bytes accepted since startup.
    pub bytes_received: u64,
    /// Largest request body accepted by `/api/push`.
    pub max_upload_bytes: u64,
}

impl HealthStatus {
    /// Snapshot `relay`.
    pub fn of(relay: &ConnectRelay) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: relay.uptime().as_secs(),
            devices: relay.total_devices(),
            rooms: relay.total_rooms(),
            entries: relay.total_entries(),
            bytes_received: relay.metrics().bytes_received.load(Ordering::Relaxed),
            max_upload_bytes: relay.config().storage.max_upload_bytes,
        }
    }
}

/// `GET /health`
pub async fn health_handler(Extension(relay): Extension<Arc<ConnectRelay>>) -> Json<HealthStatus> {
    Json(HealthStatus::of(&relay))
}
