use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total RPC calls handled. Labels: method, status.
pub const RPC_REQUESTS_TOTAL: &str = "slotbook_rpc_requests_total";

/// Histogram: RPC latency in seconds. Labels: method.
pub const RPC_DURATION_SECONDS: &str = "slotbook_rpc_duration_seconds";

// ── Scheduling outcomes ─────────────────────────────────────────

/// Counter: events created through the combined find-and-book path.
pub const BOOKINGS_TOTAL: &str = "slotbook_bookings_total";

/// Counter: find or book requests that found no free slot.
pub const NO_SLOT_TOTAL: &str = "slotbook_no_slot_total";

/// Counter: confirmations that fell back to the templated message.
pub const CONFIRMATION_FALLBACKS_TOTAL: &str = "slotbook_confirmation_fallbacks_total";

/// Gauge: events held in the store.
pub const EVENTS_STORED: &str = "slotbook_events_stored";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a JSON-RPC method name to a bounded label for metrics.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "list_events" => "list_events",
        "get_events_for_day" => "get_events_for_day",
        "find_free_slot" => "find_free_slot",
        "create_event" => "create_event",
        "book_slot" => "book_slot",
        _ => "unknown",
    }
}
