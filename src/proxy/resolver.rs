//! Request resolution: route → cluster → candidate endpoints.

use std::sync::Arc;

use crate::cluster::{ClusterInfo, EndpointInfo};
use crate::load_balancer::PoolMember;
use crate::observability::metrics;
use crate::proxy::error::ResolveError;
use crate::proxy::guard::RequestGuard;
use crate::routing::{RequestAttributes, RouteInfo};
use crate::runtime::{ConfigCoordinator, ConfigSnapshot};

/// Everything the forwarding layer needs for one request.
///
/// Resolved against a single snapshot; a reload during the request does not
/// change what the context sees.
#[derive(Debug)]
pub struct ProxyContext {
    pub generation: u64,
    pub route: Arc<RouteInfo>,
    pub cluster: Arc<ClusterInfo>,
    /// Candidates in stable order. Middleware may narrow this further.
    pub available_endpoints: Vec<PoolMember>,
    snapshot: Arc<ConfigSnapshot>,
}

impl ProxyContext {
    /// Health flag in effect: the route override, else the cluster's.
    pub fn health_check_enabled(&self) -> bool {
        self.route
            .health_check_enabled
            .unwrap_or(self.cluster.health_check.enabled)
    }

    /// Keep only the candidates the predicate accepts.
    pub fn retain_endpoints<F>(&mut self, mut keep: F)
    where
        F: FnMut(&EndpointInfo) -> bool,
    {
        self.available_endpoints.retain(|m| keep(&m.endpoint));
    }

    /// Select an endpoint with the cluster's policy and start tracking it.
    pub fn pick(&self) -> Result<RequestGuard, ResolveError> {
        let pool = self
            .snapshot
            .pool(&self.cluster.cluster_id)
            .ok_or_else(|| ResolveError::UnknownCluster {
                route_id: self.route.route_id.clone(),
                cluster_id: self.cluster.cluster_id.clone(),
            })?;

        let member = pool.pick_from(&self.available_endpoints).map_err(|e| {
            metrics::record_no_available_endpoint(&e.cluster_id);
            e
        })?;

        let mut health = self.cluster.health_check.clone();
        health.enabled = self.health_check_enabled();
        Ok(RequestGuard::new(member.clone(), health))
    }
}

/// Per-request entry point over the coordinator's current snapshot.
#[derive(Debug, Clone)]
pub struct Resolver {
    coordinator: Arc<ConfigCoordinator>,
}

impl Resolver {
    pub fn new(coordinator: Arc<ConfigCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Match a route and collect candidate endpoints.
    ///
    /// Fails with `NoAvailableEndpoint` when every endpoint is excluded.
    pub fn resolve(&self, request: &RequestAttributes) -> Result<ProxyContext, ResolveError> {
        resolve_in(self.coordinator.snapshot(), request)
    }

    pub fn coordinator(&self) -> &Arc<ConfigCoordinator> {
        &self.coordinator
    }
}

/// Resolve against a specific snapshot.
pub fn resolve_in(
    snapshot: Arc<ConfigSnapshot>,
    request: &RequestAttributes,
) -> Result<ProxyContext, ResolveError> {
    let Some(route) = snapshot.routes().match_request(request).cloned() else {
        tracing::debug!(
            generation = snapshot.generation(),
            method = %request.method,
            path = %request.path,
            "No route matched"
        );
        metrics::record_route_miss();
        return Err(ResolveError::NoRoute);
    };

    let (cluster, pool) = match (snapshot.cluster(&route.cluster_id), snapshot.pool(&route.cluster_id)) {
        (Some(cluster), Some(pool)) => (cluster, pool),
        _ => {
            tracing::warn!(
                route_id = %route.route_id,
                cluster_id = %route.cluster_id,
                "Route targets unknown cluster"
            );
            return Err(ResolveError::UnknownCluster {
                route_id: route.route_id.clone(),
                cluster_id: route.cluster_id.clone(),
            });
        }
    };

    let health_check_enabled = route
        .health_check_enabled
        .unwrap_or(cluster.health_check.enabled);
    let available_endpoints = pool.candidates(health_check_enabled);
    if available_endpoints.is_empty() {
        tracing::debug!(
            route_id = %route.route_id,
            cluster_id = %cluster.cluster_id,
            "No available endpoint"
        );
        metrics::record_no_available_endpoint(&cluster.cluster_id);
        return Err(ResolveError::NoAvailableEndpoint {
            cluster_id: cluster.cluster_id.clone(),
        });
    }

    Ok(ProxyContext {
        generation: snapshot.generation(),
        route,
        cluster,
        available_endpoints,
        snapshot,
    })
}
