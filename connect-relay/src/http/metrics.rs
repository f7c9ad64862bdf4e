//! Prometheus metrics endpoint.

use crate::server::ConnectRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<ConnectRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &ConnectRelay) -> String {
    let m = relay.metrics();

    // Gauges
    let devices = relay.total_devices();
    let rooms = relay.total_rooms();
    let entries = relay.total_entries();

    // Counters
    let inits = m.inits_total.load(Ordering::Relaxed);
    let rooms_created = m.rooms_created_total.load(Ordering::Relaxed);
    let pushes = m.pushes_total.load(Ordering::Relaxed);
    let files = m.files_total.load(Ordering::Relaxed);
    let bytes_rx = m.bytes_received.load(Ordering::Relaxed);
    let polls = m.polls_total.load(Ordering::Relaxed);
    let bridges = m.bridges_total.load(Ordering::Relaxed);
    let merged = m.rooms_merged_total.load(Ordering::Relaxed);
    let collected = m.rooms_collected_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP connect_relay_devices_registered Number of registered devices
# TYPE connect_relay_devices_registered gauge
connect_relay_devices_registered {devices}

# HELP connect_relay_rooms_active Number of live rooms
# TYPE connect_relay_rooms_active gauge
connect_relay_rooms_active {rooms}

# HELP connect_relay_entries_stored Number of entries across live rooms
# TYPE connect_relay_entries_stored gauge
connect_relay_entries_stored {entries}

# HELP connect_relay_info Server information
# TYPE connect_relay_info gauge
connect_relay_info{{version="{version}"}} 1

# HELP connect_relay_inits_total Total init requests handled
# TYPE connect_relay_inits_total counter
connect_relay_inits_total {inits}

# HELP connect_relay_rooms_created_total Total rooms created
# TYPE connect_relay_rooms_created_total counter
connect_relay_rooms_created_total {rooms_created}

# HELP connect_relay_pushes_total Total entries pushed
# TYPE connect_relay_pushes_total counter
connect_relay_pushes_total {pushes}

# HELP connect_relay_files_total Total file entries pushed
# TYPE connect_relay_files_total counter
connect_relay_files_total {files}

# HELP connect_relay_bytes_received_total Total uploaded file bytes
# TYPE connect_relay_bytes_received_total counter
connect_relay_bytes_received_total {bytes_rx}

# HELP connect_relay_polls_total Total poll requests handled
# TYPE connect_relay_polls_total counter
connect_relay_polls_total {polls}

# HELP connect_relay_bridges_total Total successful bridges
# TYPE connect_relay_bridges_total counter
connect_relay_bridges_total {bridges}

# HELP connect_relay_rooms_merged_total Total rooms merged by bridges
# TYPE connect_relay_rooms_merged_total counter
connect_relay_rooms_merged_total {merged}

# HELP connect_relay_rooms_collected_total Total orphaned rooms dropped
# TYPE connect_relay_rooms_collected_total counter
connect_relay_rooms_collected_total {collected}

# HELP connect_relay_errors_total Total rejected or failed requests
# TYPE connect_relay_errors_total counter
connect_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
