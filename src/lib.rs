//! Reverse proxy core library.
//!
//! Routing, cluster resolution, endpoint health and load balancing over a
//! hot-reloadable configuration. The forwarding layer (listener, upstream
//! client) sits on top and calls into `proxy::Resolver` per request.

// Configuration and runtime state
pub mod config;
pub mod runtime;
pub mod store;

// Request path
pub mod cluster;
pub mod load_balancer;
pub mod proxy;
pub mod routing;

// Endpoint health
pub mod health;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use config::ConfigHooks;
pub use health::HealthCheckEngine;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyContext, ResolveError, Resolver};
pub use routing::RequestAttributes;
pub use runtime::ConfigCoordinator;
