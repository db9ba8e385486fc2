//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing clusters)
//! - Validate value ranges (thresholds > 0, timeouts > 0)
//! - Detect duplicate identities
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Checks are pure functions over the raw schema
//! - Runs before any snapshot is built

use std::collections::HashSet;

use hyper::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::{ClusterConfig, HealthCheckConfig, RouteConfig, ValueMatchMode};

/// A single semantic configuration fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route id must not be empty")]
    EmptyRouteId,

    #[error("duplicate route id '{0}'")]
    DuplicateRoute(String),

    #[error("cluster id must not be empty")]
    EmptyClusterId,

    #[error("duplicate cluster id '{0}'")]
    DuplicateCluster(String),

    #[error("cluster '{cluster_id}' has duplicate endpoint id '{endpoint_id}'")]
    DuplicateEndpoint {
        cluster_id: String,
        endpoint_id: String,
    },

    #[error("route '{route_id}' references unknown cluster '{cluster_id}'")]
    UnknownCluster { route_id: String, cluster_id: String },

    #[error("route '{route_id}' has invalid host pattern '{pattern}'")]
    InvalidHost { route_id: String, pattern: String },

    #[error("route '{route_id}' has invalid path pattern '{pattern}'")]
    InvalidPath { route_id: String, pattern: String },

    #[error("route '{route_id}' has invalid method '{method}'")]
    InvalidMethod { route_id: String, method: String },

    #[error("route '{route_id}' has invalid {kind} matcher '{name}': {reason}")]
    InvalidMatcher {
        route_id: String,
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("cluster '{cluster_id}' endpoint '{endpoint_id}' has invalid address '{address}'")]
    InvalidAddress {
        cluster_id: String,
        endpoint_id: String,
        address: String,
    },

    #[error("cluster '{cluster_id}' has invalid health check option: {reason}")]
    InvalidHealthCheck {
        cluster_id: String,
        reason: &'static str,
    },
}

/// Check that route ids are non-empty and unique.
pub fn check_route_ids(routes: &[RouteConfig]) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for route in routes {
        if route.route_id.is_empty() {
            errors.push(ValidationError::EmptyRouteId);
        } else if !seen.insert(route.route_id.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.route_id.clone()));
        }
    }
    errors
}

/// Check that cluster ids are non-empty and unique.
pub fn check_cluster_ids(clusters: &[ClusterConfig]) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for cluster in clusters {
        if cluster.cluster_id.is_empty() {
            errors.push(ValidationError::EmptyClusterId);
        } else if !seen.insert(cluster.cluster_id.as_str()) {
            errors.push(ValidationError::DuplicateCluster(cluster.cluster_id.clone()));
        }
    }
    errors
}

/// Check that every `(route_id, cluster_id)` reference targets a known cluster.
pub fn check_references<'a>(
    routes: impl IntoIterator<Item = (&'a str, &'a str)>,
    cluster_ids: impl IntoIterator<Item = &'a str>,
) -> Vec<ValidationError> {
    let known: HashSet<&str> = cluster_ids.into_iter().collect();
    routes
        .into_iter()
        .filter(|(_, cluster_id)| !known.contains(cluster_id))
        .map(|(route_id, cluster_id)| ValidationError::UnknownCluster {
            route_id: route_id.to_string(),
            cluster_id: cluster_id.to_string(),
        })
        .collect()
}

/// Validate the match predicate of a single route.
pub fn validate_route(route: &RouteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let id = &route.route_id;

    for host in &route.hosts {
        if !is_valid_host_pattern(host) {
            errors.push(ValidationError::InvalidHost {
                route_id: id.clone(),
                pattern: host.clone(),
            });
        }
    }

    if let Some(path) = &route.path {
        if !is_valid_path_pattern(path) {
            errors.push(ValidationError::InvalidPath {
                route_id: id.clone(),
                pattern: path.clone(),
            });
        }
    }

    for method in &route.methods {
        if method.is_empty() || Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                route_id: id.clone(),
                method: method.clone(),
            });
        }
    }

    for header in &route.headers {
        if HeaderName::from_bytes(header.name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMatcher {
                route_id: id.clone(),
                kind: "header",
                name: header.name.clone(),
                reason: "not a valid header name",
            });
        } else if let Some(reason) = check_values(header.mode, &header.values) {
            errors.push(ValidationError::InvalidMatcher {
                route_id: id.clone(),
                kind: "header",
                name: header.name.clone(),
                reason,
            });
        }
    }

    for query in &route.query_parameters {
        let reason = if query.name.is_empty() {
            Some("name must not be empty")
        } else {
            check_values(query.mode, &query.values)
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::InvalidMatcher {
                route_id: id.clone(),
                kind: "query",
                name: query.name.clone(),
                reason,
            });
        }
    }

    errors
}

/// Validate endpoints and health options of a single cluster.
pub fn validate_cluster(cluster: &ClusterConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for endpoint in &cluster.endpoints {
        if !seen.insert(endpoint.endpoint_id.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint {
                cluster_id: cluster.cluster_id.clone(),
                endpoint_id: endpoint.endpoint_id.clone(),
            });
        }
        let valid = url::Url::parse(&endpoint.address)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidAddress {
                cluster_id: cluster.cluster_id.clone(),
                endpoint_id: endpoint.endpoint_id.clone(),
                address: endpoint.address.clone(),
            });
        }
    }

    if let Some(health) = &cluster.health_check {
        if let Some(reason) = check_health(health) {
            errors.push(ValidationError::InvalidHealthCheck {
                cluster_id: cluster.cluster_id.clone(),
                reason,
            });
        }
    }

    errors
}

fn check_health(health: &HealthCheckConfig) -> Option<&'static str> {
    if health.interval_ms == 0 {
        Some("interval must be greater than zero")
    } else if health.timeout_ms == 0 {
        Some("timeout must be greater than zero")
    } else if health.healthy_threshold == 0 || health.unhealthy_threshold == 0 {
        Some("thresholds must be greater than zero")
    } else if health.passive_failure_threshold == 0 {
        Some("passive failure threshold must be greater than zero")
    } else if !health.path.starts_with('/') {
        Some("path must start with '/'")
    } else {
        None
    }
}

fn check_values(mode: ValueMatchMode, values: &[String]) -> Option<&'static str> {
    match mode {
        ValueMatchMode::Exists => None,
        _ if values.is_empty() => Some("mode requires at least one value"),
        _ => None,
    }
}

fn is_valid_host_pattern(pattern: &str) -> bool {
    let bare = pattern.strip_prefix("*.").unwrap_or(pattern);
    !bare.is_empty()
        && !bare.contains('*')
        && !bare.contains('/')
        && !bare.starts_with('.')
        && !bare.ends_with('.')
        && !bare.chars().any(char::is_whitespace)
}

fn is_valid_path_pattern(pattern: &str) -> bool {
    if !pattern.starts_with('/') {
        return false;
    }
    match pattern.find('*') {
        Some(idx) => idx == pattern.len() - 1,
        None => true,
    }
}
