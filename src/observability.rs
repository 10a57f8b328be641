use std::net::SocketAddr;

// ── Operations ──────────────────────────────────────────────────

/// Counter: service operations. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "consultgrid_operations_total";

/// Counter: operations refused by the lifecycle. Labels: operation, state.
pub const STATE_VIOLATIONS_TOTAL: &str = "consultgrid_state_violations_total";

/// Counter: committed lifecycle transitions. Labels: to.
pub const STATE_TRANSITIONS_TOTAL: &str = "consultgrid_state_transitions_total";

// ── Schedule uploads ────────────────────────────────────────────

/// Counter: timetable uploads. Labels: path (self|admin), status.
pub const UPLOADS_TOTAL: &str = "consultgrid_uploads_total";

/// Histogram: parse + normalize + derive time in seconds.
pub const DERIVATION_DURATION_SECONDS: &str = "consultgrid_derivation_duration_seconds";

/// Counter: rows dropped because their time label matched no slot.
pub const NORMALIZATION_MISSES_TOTAL: &str = "consultgrid_normalization_misses_total";

// ── Storage ─────────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "consultgrid_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "consultgrid_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// `ok` or `error`, for the status label.
pub fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "ok" } else { "error" }
}
