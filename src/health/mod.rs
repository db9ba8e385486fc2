//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Per-cluster timer
//!     → Probe each endpoint through transport.rs
//!     → Update state.rs
//!
//! Passive health checks (passive.rs):
//!     Request outcome reported by the forwarding layer
//!     → Increment failure count
//!     → Update state.rs if threshold reached
//!
//! State machine (state.rs):
//!     Unknown → Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - State transitions require consecutive successes/failures
//! - Health state is per-endpoint and outlives configuration snapshots

pub mod active;
pub mod passive;
pub mod state;
pub mod transport;

pub use active::HealthCheckEngine;
pub use passive::RequestOutcome;
pub use state::{EndpointKey, EndpointState, HealthState};
pub use transport::{HyperProbeTransport, ProbeError, ProbeTransport};
