//! Per-request surface for the forwarding layer.
//!
//! # Data Flow
//! ```text
//! hyper::Request
//!     → routing::RequestAttributes
//!     → resolver.rs (one snapshot load: route → cluster → candidates)
//!     → ProxyContext (middleware may filter candidates)
//!     → ProxyContext::pick → guard.rs (in-flight tracking)
//!     → forward, then RequestGuard::report(outcome) → passive health
//! ```
//!
//! # Design Decisions
//! - Resolution outcomes are values (`ResolveError`), never panics
//! - `NoRoute` maps to 404, cluster/endpoint failures to 503

pub mod error;
pub mod guard;
pub mod resolver;

pub use error::ResolveError;
pub use guard::RequestGuard;
pub use resolver::{resolve_in, ProxyContext, Resolver};
