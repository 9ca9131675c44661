use std::net::SocketAddr;
use tracing::{info, warn};

pub const METRICS_PORT_ENV: &str = "SUPPLY_CALENDAR_METRICS_PORT";

/// Installs the Prometheus exporter. Failure to bind is logged, not fatal.
pub fn init_metrics() {
    let port: u16 = std::env::var(METRICS_PORT_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}
