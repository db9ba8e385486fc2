//! Least-requests load balancing strategy.

use crate::load_balancer::{LoadBalancer, PoolMember};

/// Least requests selector.
/// Selects the candidate with the fewest in-flight requests.
#[derive(Debug, Default)]
pub struct LeastRequests;

impl LeastRequests {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastRequests {
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember> {
        // In case of tie, the first one is selected (stability)
        candidates.iter().min_by_key(|m| m.state.current_requests())
    }
}
