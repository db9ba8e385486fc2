//! Random and weighted-random load balancing strategies.

use rand::Rng;

use crate::load_balancer::{LoadBalancer, PoolMember};

/// Uniform random selector.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        candidates.get(index)
    }
}

/// Random selector weighted by `EndpointInfo::weight`.
///
/// Zero-weight endpoints are only chosen when every candidate has weight 0,
/// in which case the choice is uniform.
#[derive(Debug, Default)]
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedRandom {
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember> {
        let total: u64 = candidates.iter().map(|m| u64::from(m.endpoint.weight)).sum();
        if total == 0 {
            return Random.pick(candidates);
        }

        let mut target = rand::thread_rng().gen_range(0..total);
        for member in candidates {
            let weight = u64::from(member.endpoint.weight);
            if target < weight {
                return Some(member);
            }
            target -= weight;
        }
        candidates.last()
    }
}
