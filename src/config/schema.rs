//! Configuration schema definitions.
//!
//! This module defines the raw configuration handed to the core by whatever
//! source loads it (file loader, control plane, tests). All types derive Serde
//! traits so the same structures deserialize from TOML or JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cluster::LoadBalancingPolicy;

/// Root configuration for the proxy core.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Route definitions mapping requests to clusters.
    pub routes: Vec<RouteConfig>,

    /// Cluster (backend pool) definitions.
    pub clusters: Vec<ClusterConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Route configuration mapping requests to a cluster.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouteConfig {
    /// Unique route identifier.
    pub route_id: String,

    /// Host patterns (`api.example.com` or `*.example.com`). Empty = any host.
    pub hosts: Vec<String>,

    /// Path pattern. Exact unless it ends in `*`, which makes it a prefix.
    pub path: Option<String>,

    /// HTTP methods to match. Empty = any method.
    pub methods: Vec<String>,

    /// Header matchers, all of which must pass.
    pub headers: Vec<HeaderMatchConfig>,

    /// Query parameter matchers, all of which must pass.
    pub query_parameters: Vec<QueryMatchConfig>,

    /// Route priority (lower = checked first). Absent means 0.
    pub priority: Option<i32>,

    /// Cluster to forward matched requests to.
    pub cluster_id: String,

    /// Overrides the target cluster's health-check flag for candidate selection
    /// and passive reports. `true` also makes the cluster actively probed.
    pub health_check_enabled: Option<bool>,

    /// Arbitrary key/value metadata.
    pub metadata: HashMap<String, String>,
}

/// How a header or query value is compared.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueMatchMode {
    #[default]
    Exact,
    Prefix,
    Contains,
    /// Only the presence of the name is checked.
    Exists,
}

/// Header matcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HeaderMatchConfig {
    pub name: String,
    pub values: Vec<String>,
    pub mode: ValueMatchMode,
    pub case_sensitive: bool,
}

/// Query parameter matcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct QueryMatchConfig {
    pub name: String,
    pub values: Vec<String>,
    pub mode: ValueMatchMode,
    pub case_sensitive: bool,
}

/// Cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Unique cluster identifier.
    pub cluster_id: String,

    /// Endpoints serving this cluster.
    pub endpoints: Vec<EndpointConfig>,

    /// Health check options. Initialized to defaults when absent.
    pub health_check: Option<HealthCheckConfig>,

    /// Endpoint selection strategy.
    pub load_balancing: LoadBalancingPolicy,

    /// Arbitrary key/value metadata.
    pub metadata: HashMap<String, String>,
}

/// A single endpoint inside a cluster.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EndpointConfig {
    /// Endpoint identifier, unique within its cluster.
    pub endpoint_id: String,

    /// Base address (e.g., "http://127.0.0.1:3000").
    pub address: String,

    /// Weight for weighted random selection (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl EndpointConfig {
    /// Endpoint with the default weight.
    pub fn new(endpoint_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            address: address.into(),
            weight: default_weight(),
        }
    }
}

/// Health check configuration for a cluster.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active and passive health tracking.
    pub enabled: bool,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path to probe.
    pub path: String,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,

    /// Number of consecutive failed probes before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive failed proxied requests before marking unhealthy.
    pub passive_failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 10_000,
            timeout_ms: 5_000,
            path: "/health".to_string(),
            healthy_threshold: 2,
            unhealthy_threshold: 3,
            passive_failure_threshold: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
