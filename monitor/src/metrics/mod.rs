//! Prometheus metrics export
//!
//! Sweep counters are recorded unconditionally; without an installed
//! recorder they are no-ops.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve scrapes on `listen`
pub fn init_metrics(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid metrics listen address: {}", listen))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    Ok(())
}

/// Record a completed container listing
pub fn record_sweep(kind: &str, containers_found: usize) {
    counter!("dockwatch_sweeps_total", "kind" => kind.to_string()).increment(1);
    gauge!("dockwatch_containers_found", "kind" => kind.to_string()).set(containers_found as f64);
}

/// Record a failed container listing
pub fn record_list_error(kind: &str) {
    counter!("dockwatch_list_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record a per-container exec or inspect failure
pub fn record_container_error(kind: &str) {
    counter!("dockwatch_container_errors_total", "kind" => kind.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_listen_address() {
        assert!(init_metrics("not-an-address").is_err());
    }

    #[test]
    fn test_record_without_recorder() {
        // Should not panic
        record_sweep("exec", 3);
        record_list_error("inspect");
        record_container_error("exec");
    }
}
