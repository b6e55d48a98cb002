//! Prometheus metrics for the tracker.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for the tracker.
///
/// Metrics are registered with the global metrics registry on creation.
/// Without an installed recorder every call is a no-op.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Fetch metrics
        describe_counter!(
            "tracker_fetch_success_total",
            "Total successful balance fetches by chain family"
        );
        describe_counter!(
            "tracker_fetch_failure_total",
            "Total failed balance fetches by chain family"
        );
        describe_histogram!(
            "tracker_fetch_duration_seconds",
            "Duration of each balance fetch in seconds"
        );

        // Alert metrics
        describe_counter!(
            "tracker_alerts_triggered_total",
            "Total number of alert triggers delivered to the signal sink"
        );

        // Scheduler metrics
        describe_counter!(
            "tracker_refresh_cycles_total",
            "Total number of refresh-all cycles"
        );
        describe_gauge!(
            "tracker_tracked_queries",
            "Current number of tracked queries"
        );
    }

    /// Record a completed fetch.
    pub fn record_fetch(&self, family: &str, success: bool, duration: Duration) {
        histogram!("tracker_fetch_duration_seconds").record(duration.as_secs_f64());

        if success {
            counter!("tracker_fetch_success_total", "family" => family.to_string()).increment(1);
        } else {
            counter!("tracker_fetch_failure_total", "family" => family.to_string()).increment(1);
        }
    }

    pub fn record_alert(&self) {
        counter!("tracker_alerts_triggered_total").increment(1);
    }

    pub fn record_refresh_cycle(&self) {
        counter!("tracker_refresh_cycles_total").increment(1);
    }

    pub fn set_tracked_queries(&self, count: usize) {
        gauge!("tracker_tracked_queries").set(count as f64);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
