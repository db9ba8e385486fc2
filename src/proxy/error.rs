//! Per-request resolution outcomes.

use hyper::http::StatusCode;
use thiserror::Error;

use crate::load_balancer::NoAvailableEndpoint;

/// Why a request could not be assigned an endpoint.
///
/// These are ordinary outcomes for the forwarding layer, not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no route matches the request")]
    NoRoute,

    #[error("route '{route_id}' targets unknown cluster '{cluster_id}'")]
    UnknownCluster { route_id: String, cluster_id: String },

    #[error("no available endpoint in cluster '{cluster_id}'")]
    NoAvailableEndpoint { cluster_id: String },
}

impl ResolveError {
    /// Response status the forwarding layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::NoRoute => StatusCode::NOT_FOUND,
            ResolveError::UnknownCluster { .. } | ResolveError::NoAvailableEndpoint { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl From<NoAvailableEndpoint> for ResolveError {
    fn from(err: NoAvailableEndpoint) -> Self {
        ResolveError::NoAvailableEndpoint {
            cluster_id: err.cluster_id,
        }
    }
}
