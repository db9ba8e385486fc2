//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → cluster_id identified
//!     → pool.rs (candidate endpoints for the cluster)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through candidates)
//!         - least_requests.rs (fewest in-flight requests)
//!         - random.rs (uniform or weighted random)
//!         - power_of_two.rs (lesser-loaded of two random picks)
//!         - first.rs (first candidate)
//!     → Return chosen endpoint or NoAvailableEndpoint
//! ```
//!
//! # Design Decisions
//! - Strategies are pure over the candidate slice; filtering happens in the pool
//! - One balancer instance per cluster per snapshot, so counters never leak
//!   between clusters
//! - In-flight counts are maintained by the caller (begin/end hooks)

pub mod first;
pub mod least_requests;
pub mod pool;
pub mod power_of_two;
pub mod random;
pub mod round_robin;

use std::fmt::Debug;

use crate::cluster::LoadBalancingPolicy;

pub use pool::{EndpointPool, NoAvailableEndpoint, PoolMember};

/// Endpoint selection strategy.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Pick one candidate. Returns `None` only for an empty slice.
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember>;
}

/// Construct the balancer for a policy.
pub fn for_policy(policy: LoadBalancingPolicy) -> Box<dyn LoadBalancer> {
    match policy {
        LoadBalancingPolicy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        LoadBalancingPolicy::LeastRequests => Box::new(least_requests::LeastRequests::new()),
        LoadBalancingPolicy::Random => Box::new(random::Random::new()),
        LoadBalancingPolicy::WeightedRandom => Box::new(random::WeightedRandom::new()),
        LoadBalancingPolicy::PowerOfTwoChoices => Box::new(power_of_two::PowerOfTwoChoices::new()),
        LoadBalancingPolicy::First => Box::new(first::First),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::cluster::EndpointInfo;
    use crate::health::state::EndpointState;
    use crate::load_balancer::PoolMember;

    pub fn member(id: &str, port: u16) -> PoolMember {
        weighted(id, port, 1)
    }

    pub fn weighted(id: &str, port: u16, weight: u32) -> PoolMember {
        PoolMember {
            endpoint: Arc::new(EndpointInfo {
                endpoint_id: id.into(),
                cluster_id: "test".into(),
                address: format!("http://127.0.0.1:{port}").parse().unwrap(),
                weight,
            }),
            state: Arc::new(EndpointState::new()),
        }
    }
}
