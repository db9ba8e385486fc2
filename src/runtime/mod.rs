//! Runtime configuration state.
//!
//! # Data Flow
//! ```text
//! ProxyConfig
//!     → coordinator.rs (serialised apply)
//!     → snapshot.rs (RouteTable + ClusterStore + EndpointPools)
//!     → ArcSwap store, watch notification
//!     → readers: proxy::Resolver, health::HealthCheckEngine
//! ```

pub mod coordinator;
pub mod snapshot;

pub use coordinator::ConfigCoordinator;
pub use snapshot::ConfigSnapshot;
