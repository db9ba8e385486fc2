//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → ProxyConfig (raw)
//!     → hooks.rs (defaults, metadata, per-id overrides, code routes)
//!     → validation.rs (semantic checks, all faults collected)
//!     → runtime::ConfigCoordinator builds and publishes a snapshot
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → sent over mpsc to the coordinator
//!     → rejected configs leave the current snapshot in place
//! ```
//!
//! # Design Decisions
//! - Raw config is plain data; runtime models are built from it, never shared
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod hooks;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use hooks::ConfigHooks;
pub use loader::{load_config, ConfigError};
pub use schema::{
    ClusterConfig, EndpointConfig, HealthCheckConfig, HeaderMatchConfig, ObservabilityConfig,
    ProxyConfig, QueryMatchConfig, RouteConfig, ValueMatchMode,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
