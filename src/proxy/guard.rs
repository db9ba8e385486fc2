//! In-flight request tracking.

use std::ops::Deref;
use std::sync::Arc;

use crate::cluster::{EndpointInfo, HealthCheckOptions};
use crate::health::passive::{self, RequestOutcome};
use crate::health::state::{EndpointState, HealthState};
use crate::load_balancer::PoolMember;

/// Guard for one request sent to an endpoint.
///
/// Increments the endpoint's in-flight counter on creation and decrements it
/// on drop, so least-requests style balancers see live load.
#[derive(Debug)]
pub struct RequestGuard {
    member: PoolMember,
    health: HealthCheckOptions,
}

impl RequestGuard {
    pub(crate) fn new(member: PoolMember, health: HealthCheckOptions) -> Self {
        member.state.begin_request();
        Self { member, health }
    }

    pub fn endpoint(&self) -> &Arc<EndpointInfo> {
        &self.member.endpoint
    }

    pub fn state(&self) -> &EndpointState {
        &self.member.state
    }

    /// Report how the request went, for passive health checking.
    ///
    /// Returns the new health state if the report caused a transition.
    pub fn report(&self, outcome: RequestOutcome) -> Option<HealthState> {
        passive::observe(&self.health, &self.member.endpoint, &self.member.state, outcome)
    }
}

impl Deref for RequestGuard {
    type Target = EndpointInfo;
    fn deref(&self) -> &Self::Target {
        &self.member.endpoint
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.member.state.end_request();
    }
}
