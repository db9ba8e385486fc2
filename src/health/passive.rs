//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe request outcomes reported by the forwarding layer
//! - Track consecutive failures
//! - Trigger state transition on threshold breach
//!
//! # Design Decisions
//! - Only transport errors and 5xx count as failures
//! - Timeouts are transport failures
//! - 4xx are NOT failures (client error, not backend)
//! - A success clears the failure streak; only active probes restore Healthy
//! - Ignored entirely when health checking is off for the request's route
//!   (route override, else the cluster flag)

use hyper::http::StatusCode;

use crate::cluster::{EndpointInfo, HealthCheckOptions};
use crate::health::state::{EndpointState, HealthState};
use crate::observability::metrics;

/// Outcome of one proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    /// Connection refused/reset, timeout, TLS failure and the like.
    TransportFailure,
    /// The upstream answered with a 5xx status.
    UpstreamServerError,
}

impl RequestOutcome {
    /// Classify an upstream response status.
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            RequestOutcome::UpstreamServerError
        } else {
            RequestOutcome::Success
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, RequestOutcome::Success)
    }
}

/// Feed one request outcome into an endpoint's state.
///
/// Returns the new state if the report caused a transition.
pub fn observe(
    options: &HealthCheckOptions,
    endpoint: &EndpointInfo,
    state: &EndpointState,
    outcome: RequestOutcome,
) -> Option<HealthState> {
    if !options.enabled {
        return None;
    }

    if !outcome.is_failure() {
        state.clear_failures();
        return None;
    }

    metrics::record_passive_failure(&endpoint.cluster_id);
    let transition = state.record_failure(options.passive_failure_threshold);
    if let Some(next) = transition {
        tracing::warn!(
            cluster_id = %endpoint.cluster_id,
            endpoint_id = %endpoint.endpoint_id,
            outcome = ?outcome,
            failures = state.consecutive_failures(),
            "Endpoint marked {} by passive health check",
            next
        );
        metrics::record_endpoint_health(&endpoint.cluster_id, &endpoint.endpoint_id, next);
    } else {
        tracing::debug!(
            cluster_id = %endpoint.cluster_id,
            endpoint_id = %endpoint.endpoint_id,
            outcome = ?outcome,
            failures = state.consecutive_failures(),
            "Passive failure recorded"
        );
    }
    transition
}
