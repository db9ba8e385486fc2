//! First-available strategy.

use crate::load_balancer::{LoadBalancer, PoolMember};

/// Always the first candidate; useful for active/standby clusters.
#[derive(Debug, Default)]
pub struct First;

impl LoadBalancer for First {
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember> {
        candidates.first()
    }
}
