//! Cluster (backend pool) model.
//!
//! # Data Flow
//! ```text
//! ClusterConfig (raw)
//!     → config::hooks (defaults → metadata → named override)
//!     → builder.rs (validate, parse addresses)
//!     → ClusterInfo (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - ClusterInfo and EndpointInfo never change once built; membership
//!   changes produce a new ClusterInfo in a new snapshot
//! - Mutable per-endpoint state lives in `health::state`, not here

pub mod builder;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::schema::HealthCheckConfig;

pub use builder::{build_cluster, build_clusters};

/// Endpoint selection strategy for a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingPolicy {
    #[default]
    RoundRobin,
    LeastRequests,
    Random,
    WeightedRandom,
    PowerOfTwoChoices,
    /// Always the first candidate in stable order.
    First,
}

impl LoadBalancingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancingPolicy::RoundRobin => "round_robin",
            LoadBalancingPolicy::LeastRequests => "least_requests",
            LoadBalancingPolicy::Random => "random",
            LoadBalancingPolicy::WeightedRandom => "weighted_random",
            LoadBalancingPolicy::PowerOfTwoChoices => "power_of_two_choices",
            LoadBalancingPolicy::First => "first",
        }
    }
}

impl fmt::Display for LoadBalancingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown load balancing policy '{0}'")]
pub struct UnknownPolicy(pub String);

impl FromStr for LoadBalancingPolicy {
    type Err = UnknownPolicy;

    /// Accepts `RoundRobin`, `round_robin` and `round-robin` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "roundrobin" => Ok(LoadBalancingPolicy::RoundRobin),
            "leastrequests" => Ok(LoadBalancingPolicy::LeastRequests),
            "random" => Ok(LoadBalancingPolicy::Random),
            "weightedrandom" => Ok(LoadBalancingPolicy::WeightedRandom),
            "poweroftwochoices" | "p2c" => Ok(LoadBalancingPolicy::PowerOfTwoChoices),
            "first" => Ok(LoadBalancingPolicy::First),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Runtime health-check options with parsed durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckOptions {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
    pub path: String,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    pub passive_failure_threshold: u32,
}

impl From<&HealthCheckConfig> for HealthCheckOptions {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_millis(config.interval_ms),
            timeout: Duration::from_millis(config.timeout_ms),
            path: config.path.clone(),
            healthy_threshold: config.healthy_threshold,
            unhealthy_threshold: config.unhealthy_threshold,
            passive_failure_threshold: config.passive_failure_threshold,
        }
    }
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self::from(&HealthCheckConfig::default())
    }
}

/// One network-addressable backend instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub endpoint_id: String,
    pub cluster_id: String,
    /// Base URL requests and probes are sent to.
    pub address: Url,
    pub weight: u32,
}

/// A named pool of endpoints sharing health and balancing policy.
#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub endpoints: Vec<Arc<EndpointInfo>>,
    pub health_check: HealthCheckOptions,
    pub load_balancing: LoadBalancingPolicy,
    pub metadata: HashMap<String, String>,
}

impl ClusterInfo {
    /// Empty cluster with default options.
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            endpoints: Vec::new(),
            health_check: HealthCheckOptions::default(),
            load_balancing: LoadBalancingPolicy::default(),
            metadata: HashMap::new(),
        }
    }

    pub fn endpoint(&self, endpoint_id: &str) -> Option<&Arc<EndpointInfo>> {
        self.endpoints.iter().find(|e| e.endpoint_id == endpoint_id)
    }
}
