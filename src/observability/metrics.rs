//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ssr_requests_total` (counter): rendered requests by site, status
//! - `ssr_render_duration_seconds` (histogram): dispatch-to-response latency by site

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on the current runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched render.
pub fn record_render(site: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "ssr_requests_total",
        "site" => site.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("ssr_render_duration_seconds", "site" => site.to_string())
        .record(start.elapsed().as_secs_f64());
}
