//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path, headers, query)
//!     → request.rs (RequestAttributes)
//!     → table.rs (route lookup in match order)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched RouteInfo or NoMatch
//!
//! Route Compilation (per snapshot):
//!     RouteConfig[]
//!     → config::hooks (clamp, defaults, named overrides)
//!     → config::validation (ids, predicates)
//!     → Compile matchers, sort by priority + tie-break
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled on every apply, immutable at runtime
//! - No regex in hot path (exact, prefix and wildcard matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority, then tie-break)

pub mod matcher;
pub mod request;
pub mod route;
pub mod table;

pub use request::RequestAttributes;
pub use route::RouteInfo;
pub use table::RouteTable;
