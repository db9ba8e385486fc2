//! Code-level configuration hooks.
//!
//! Hooks let the host application adjust routes and clusters after they are
//! read from the configuration source but before they are validated and
//! compiled. Every hook is a transform `(entity, context) -> entity`; nothing
//! is looked up from ambient state.
//!
//! # Stage order
//! ```text
//! Cluster: built-in defaults → cluster defaults → built-in metadata
//!          → metadata hooks → named override (by cluster id)
//! Route:   built-in priority clamp → route defaults → named override (by route id)
//! ```
//! Each stage receives the previous stage's output and may replace it wholesale.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::schema::{ClusterConfig, HealthCheckConfig, RouteConfig};

/// Metadata key that toggles health checking for a cluster.
pub const CUSTOM_HEALTH_KEY: &str = "CustomHealth";

type ClusterHook = Arc<dyn Fn(&str, ClusterConfig) -> ClusterConfig + Send + Sync>;
type NamedClusterHook = Arc<dyn Fn(ClusterConfig) -> ClusterConfig + Send + Sync>;
type RouteHook = Arc<dyn Fn(RouteConfig) -> RouteConfig + Send + Sync>;

/// Registered configuration hooks.
#[derive(Clone)]
pub struct ConfigHooks {
    clamp_negative_priority: bool,
    cluster_defaults: Vec<ClusterHook>,
    cluster_metadata: Vec<ClusterHook>,
    cluster_overrides: HashMap<String, Vec<NamedClusterHook>>,
    route_defaults: Vec<RouteHook>,
    route_overrides: HashMap<String, Vec<RouteHook>>,
    code_routes: Vec<RouteConfig>,
}

impl Default for ConfigHooks {
    fn default() -> Self {
        Self {
            clamp_negative_priority: true,
            cluster_defaults: Vec::new(),
            cluster_metadata: Vec::new(),
            cluster_overrides: HashMap::new(),
            route_defaults: Vec::new(),
            route_overrides: HashMap::new(),
            code_routes: Vec::new(),
        }
    }
}

impl fmt::Debug for ConfigHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHooks")
            .field("clamp_negative_priority", &self.clamp_negative_priority)
            .field("cluster_defaults", &self.cluster_defaults.len())
            .field("cluster_metadata", &self.cluster_metadata.len())
            .field("cluster_overrides", &self.cluster_overrides.keys().collect::<Vec<_>>())
            .field("route_defaults", &self.route_defaults.len())
            .field("route_overrides", &self.route_overrides.keys().collect::<Vec<_>>())
            .field("code_routes", &self.code_routes.len())
            .finish()
    }
}

impl ConfigHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep or disable the built-in clamp of negative route priorities to 0.
    pub fn clamp_negative_priority(mut self, enabled: bool) -> Self {
        self.clamp_negative_priority = enabled;
        self
    }

    /// Hook applied to every cluster before metadata and named overrides.
    pub fn configure_cluster_defaults<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, ClusterConfig) -> ClusterConfig + Send + Sync + 'static,
    {
        self.cluster_defaults.push(Arc::new(f));
        self
    }

    /// Hook applied to every cluster after the built-in metadata stage.
    pub fn configure_cluster_metadata<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, ClusterConfig) -> ClusterConfig + Send + Sync + 'static,
    {
        self.cluster_metadata.push(Arc::new(f));
        self
    }

    /// Hook applied last, only to the cluster with this id.
    pub fn configure_cluster<F>(mut self, cluster_id: impl Into<String>, f: F) -> Self
    where
        F: Fn(ClusterConfig) -> ClusterConfig + Send + Sync + 'static,
    {
        self.cluster_overrides
            .entry(cluster_id.into())
            .or_default()
            .push(Arc::new(f));
        self
    }

    /// Hook applied to every route after the priority clamp.
    pub fn configure_route_defaults<F>(mut self, f: F) -> Self
    where
        F: Fn(RouteConfig) -> RouteConfig + Send + Sync + 'static,
    {
        self.route_defaults.push(Arc::new(f));
        self
    }

    /// Hook applied last, only to the route with this id.
    pub fn configure_route<F>(mut self, route_id: impl Into<String>, f: F) -> Self
    where
        F: Fn(RouteConfig) -> RouteConfig + Send + Sync + 'static,
    {
        self.route_overrides
            .entry(route_id.into())
            .or_default()
            .push(Arc::new(f));
        self
    }

    /// Named route override that needs an external service to compute its result.
    ///
    /// The service is handed to the hook on every apply, so values it produces
    /// (cache lookups and the like) are re-read on each reload.
    pub fn configure_route_with<S, F>(
        self,
        route_id: impl Into<String>,
        service: Arc<S>,
        f: F,
    ) -> Self
    where
        S: Send + Sync + 'static + ?Sized,
        F: Fn(RouteConfig, &S) -> RouteConfig + Send + Sync + 'static,
    {
        self.configure_route(route_id, move |route| f(route, &*service))
    }

    /// Force a priority on the named route.
    pub fn override_route_priority(self, route_id: impl Into<String>, priority: i32) -> Self {
        self.configure_route(route_id, move |mut route| {
            route.priority = Some(priority);
            route
        })
    }

    /// Force the health-check flag used for candidates of the named route.
    pub fn override_route_health_check(self, route_id: impl Into<String>, enabled: bool) -> Self {
        self.configure_route(route_id, move |mut route| {
            route.health_check_enabled = Some(enabled);
            route
        })
    }

    /// Route defined in code. Merged into every applied configuration and
    /// exempt from the priority clamp.
    pub fn add_code_route(mut self, route: RouteConfig) -> Self {
        self.code_routes.push(route);
        self
    }

    /// Apply every cluster stage in order.
    pub fn apply_cluster(&self, cluster: ClusterConfig) -> ClusterConfig {
        let id = cluster.cluster_id.clone();

        let mut cluster = init_health_options(cluster);
        for hook in &self.cluster_defaults {
            cluster = hook(&id, cluster);
        }

        cluster = custom_health_from_metadata(cluster);
        for hook in &self.cluster_metadata {
            cluster = hook(&id, cluster);
        }

        if let Some(hooks) = self.cluster_overrides.get(&id) {
            for hook in hooks {
                cluster = hook(cluster);
            }
        }
        cluster
    }

    /// Apply every route stage to a configuration-sourced route.
    pub fn apply_route(&self, route: RouteConfig) -> RouteConfig {
        let mut route = route;
        if self.clamp_negative_priority {
            route = clamp_priority(route);
        }
        self.apply_route_hooks(route)
    }

    /// Configuration routes after hooks, followed by the code-defined routes.
    pub fn apply_routes(&self, routes: Vec<RouteConfig>) -> Vec<RouteConfig> {
        let mut out: Vec<RouteConfig> = routes.into_iter().map(|r| self.apply_route(r)).collect();
        out.extend(
            self.code_routes
                .iter()
                .cloned()
                .map(|r| self.apply_route_hooks(r)),
        );
        out
    }

    fn apply_route_hooks(&self, mut route: RouteConfig) -> RouteConfig {
        for hook in &self.route_defaults {
            route = hook(route);
        }
        if let Some(hooks) = self.route_overrides.get(&route.route_id) {
            for hook in hooks {
                route = hook(route);
            }
        }
        route
    }
}

fn init_health_options(mut cluster: ClusterConfig) -> ClusterConfig {
    cluster.health_check.get_or_insert_with(HealthCheckConfig::default);
    cluster
}

fn clamp_priority(mut route: RouteConfig) -> RouteConfig {
    if let Some(p) = route.priority {
        if p < 0 {
            tracing::debug!(route_id = %route.route_id, priority = p, "Clamping negative route priority to 0");
            route.priority = Some(0);
        }
    }
    route
}

/// Built-in metadata stage: `CustomHealth = "true"` enables health checks,
/// `"false"` disables them, anything else leaves the flag alone.
pub fn custom_health_from_metadata(mut cluster: ClusterConfig) -> ClusterConfig {
    let toggle = cluster
        .metadata
        .get(CUSTOM_HEALTH_KEY)
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        });
    if let Some(enabled) = toggle {
        cluster
            .health_check
            .get_or_insert_with(HealthCheckConfig::default)
            .enabled = enabled;
    }
    cluster
}
