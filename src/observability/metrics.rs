//! Metrics collection.
//!
//! # Metrics
//! - `proxy_config_reloads_total` (counter): applies by result
//! - `proxy_config_generation` (gauge): generation of the published snapshot
//! - `proxy_route_misses_total` (counter): requests with no matching route
//! - `proxy_no_available_endpoint_total` (counter): by cluster
//! - `proxy_health_probes_total` (counter): by cluster, result
//! - `proxy_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//! - `proxy_passive_failures_total` (counter): by cluster
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the host installs the exporter
//! - Without an installed recorder every call is a no-op

use crate::health::state::HealthState;

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "rejected" };
    metrics::counter!("proxy_config_reloads_total", "result" => result).increment(1);
}

pub fn record_generation(generation: u64) {
    metrics::gauge!("proxy_config_generation").set(generation as f64);
}

pub fn record_route_miss() {
    metrics::counter!("proxy_route_misses_total").increment(1);
}

pub fn record_no_available_endpoint(cluster_id: &str) {
    metrics::counter!("proxy_no_available_endpoint_total", "cluster" => cluster_id.to_string()).increment(1);
}

pub fn record_probe(cluster_id: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!(
        "proxy_health_probes_total",
        "cluster" => cluster_id.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_endpoint_health(cluster_id: &str, endpoint_id: &str, state: HealthState) {
    let value = if state == HealthState::Unhealthy { 0.0 } else { 1.0 };
    metrics::gauge!(
        "proxy_endpoint_health",
        "cluster" => cluster_id.to_string(),
        "endpoint" => endpoint_id.to_string()
    )
    .set(value);
}

pub fn record_passive_failure(cluster_id: &str) {
    metrics::counter!("proxy_passive_failures_total", "cluster" => cluster_id.to_string()).increment(1);
}
