//! Endpoint health state machine.
//!
//! # States
//! - Unknown: no conclusive signal yet
//! - Healthy: endpoint receives traffic
//! - Unhealthy: endpoint excluded from load balancing
//!
//! # State Transitions
//! ```text
//! Unknown/Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! Unknown/Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! ```
//!
//! # Shared failure streak
//! Probes and passive reports feed the same `consecutive_failures` counter.
//! Each caller compares it against its own threshold (`unhealthy_threshold`
//! for probes, `passive_failure_threshold` for reports), so a streak built by
//! one signal counts toward the other: with an unhealthy threshold of 3, two
//! passive failures followed by one failed probe mark the endpoint Unhealthy.
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Every field is an atomic; no cross-endpoint locking
//! - Transitions are returned to the caller so they can be logged once

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::store::ItemStore;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Mutable health and load counters for one endpoint.
#[derive(Debug, Default)]
pub struct EndpointState {
    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    health: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    /// In-flight proxied requests.
    current_requests: AtomicUsize,
    /// Set while an active probe is outstanding.
    probing: AtomicBool,
}

impl EndpointState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.health.load(Ordering::Acquire))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes.load(Ordering::Relaxed)
    }

    pub fn current_requests(&self) -> usize {
        self.current_requests.load(Ordering::Relaxed)
    }

    /// Healthy, or Unknown (no conclusive signal yet).
    pub fn is_available(&self) -> bool {
        self.health() != HealthState::Unhealthy
    }

    /// Called by the forwarding layer before a request is sent.
    pub fn begin_request(&self) {
        self.current_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Called by the forwarding layer once a request completes.
    pub fn end_request(&self) {
        // Never wraps below zero on an unbalanced end.
        let _ = self
            .current_requests
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a successful probe.
    ///
    /// Returns the new state if this call caused a transition.
    pub fn record_success(&self, healthy_threshold: u32) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;

        if successes >= healthy_threshold {
            return self.transition(HealthState::Healthy);
        }
        None
    }

    /// Record a failed probe or proxied request.
    ///
    /// Returns the new state if this call caused a transition.
    pub fn record_failure(&self, unhealthy_threshold: u32) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

        if failures >= unhealthy_threshold {
            return self.transition(HealthState::Unhealthy);
        }
        None
    }

    /// A successful proxied request clears the failure streak but never
    /// promotes the endpoint; only probes do that.
    pub fn clear_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn transition(&self, next: HealthState) -> Option<HealthState> {
        let prev = HealthState::from(self.health.swap(next as u8, Ordering::AcqRel));
        (prev != next).then_some(next)
    }

    /// Claim the probe slot. Returns false if a probe is already in flight.
    pub fn try_begin_probe(&self) -> bool {
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_probe(&self) {
        self.probing.store(false, Ordering::Release);
    }
}

/// Endpoint state identity: endpoint ids are unique within a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub cluster_id: String,
    pub endpoint_id: String,
}

impl EndpointKey {
    pub fn new(cluster_id: impl Into<String>, endpoint_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            endpoint_id: endpoint_id.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_id, self.endpoint_id)
    }
}

/// Registry of endpoint states, independent of snapshot identity.
pub type EndpointStates = ItemStore<EndpointState, EndpointKey>;

impl EndpointStates {
    pub fn empty() -> Self {
        ItemStore::new(|_: &EndpointKey| EndpointState::new())
    }
}

/// Shared handle to the registry.
pub type SharedEndpointStates = Arc<EndpointStates>;
