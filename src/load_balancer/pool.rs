//! Endpoint pool management.
//!
//! # Responsibilities
//! - Pair each endpoint of a cluster with its shared mutable state
//! - Filter candidates by health
//! - Apply the cluster's load balancing algorithm to select an endpoint

use std::sync::Arc;

use thiserror::Error;

use crate::cluster::{ClusterInfo, EndpointInfo};
use crate::health::state::{EndpointKey, EndpointState, EndpointStates};
use crate::load_balancer::{for_policy, LoadBalancer};

/// An endpoint together with its live state.
#[derive(Debug, Clone)]
pub struct PoolMember {
    pub endpoint: Arc<EndpointInfo>,
    pub state: Arc<EndpointState>,
}

impl PoolMember {
    pub fn endpoint_id(&self) -> &str {
        &self.endpoint.endpoint_id
    }
}

/// No candidate endpoint could be selected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no available endpoint in cluster '{cluster_id}'")]
pub struct NoAvailableEndpoint {
    pub cluster_id: String,
}

/// All endpoints of one cluster plus its balancer.
#[derive(Debug)]
pub struct EndpointPool {
    cluster: Arc<ClusterInfo>,
    members: Vec<PoolMember>,
    balancer: Box<dyn LoadBalancer>,
}

impl EndpointPool {
    /// Build a pool, attaching each endpoint to its state in `states`.
    ///
    /// States are created on first sight and reused for endpoints that
    /// survive a reload.
    pub fn new(cluster: Arc<ClusterInfo>, states: &EndpointStates) -> Self {
        let members = cluster
            .endpoints
            .iter()
            .map(|endpoint| PoolMember {
                endpoint: endpoint.clone(),
                state: states.get_or_create(EndpointKey::new(
                    cluster.cluster_id.clone(),
                    endpoint.endpoint_id.clone(),
                )),
            })
            .collect();
        let balancer = for_policy(cluster.load_balancing);

        Self {
            cluster,
            members,
            balancer,
        }
    }

    pub fn cluster(&self) -> &Arc<ClusterInfo> {
        &self.cluster
    }

    /// Every member in configuration order.
    pub fn members(&self) -> &[PoolMember] {
        &self.members
    }

    pub fn member(&self, endpoint_id: &str) -> Option<&PoolMember> {
        self.members.iter().find(|m| m.endpoint_id() == endpoint_id)
    }

    /// Candidates in stable order.
    ///
    /// With health checking enabled, Unhealthy endpoints are excluded.
    /// With it disabled, every endpoint is a candidate.
    pub fn candidates(&self, health_check_enabled: bool) -> Vec<PoolMember> {
        self.members
            .iter()
            .filter(|m| !health_check_enabled || m.state.is_available())
            .cloned()
            .collect()
    }

    /// Apply the cluster's policy to an already-filtered candidate list.
    pub fn pick_from<'a>(
        &self,
        candidates: &'a [PoolMember],
    ) -> Result<&'a PoolMember, NoAvailableEndpoint> {
        match self.balancer.pick(candidates) {
            Some(member) => Ok(member),
            None => {
                tracing::debug!(
                    cluster_id = %self.cluster.cluster_id,
                    endpoint_count = self.members.len(),
                    "No available endpoints in cluster"
                );
                for m in &self.members {
                    tracing::debug!(
                        endpoint_id = %m.endpoint.endpoint_id,
                        health = %m.state.health(),
                        "Endpoint status"
                    );
                }
                Err(NoAvailableEndpoint {
                    cluster_id: self.cluster.cluster_id.clone(),
                })
            }
        }
    }

    /// Pick using the cluster's own health-check flag.
    pub fn pick(&self) -> Result<PoolMember, NoAvailableEndpoint> {
        let candidates = self.candidates(self.cluster.health_check.enabled);
        self.pick_from(&candidates).cloned()
    }
}
