//! Compiled route definition.

use std::collections::HashMap;

use crate::config::schema::RouteConfig;
use crate::routing::matcher::{Matcher, RouteMatch};
use crate::routing::request::RequestAttributes;

/// A route as held by a published snapshot. Never mutated; replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    pub route_id: String,
    pub matcher: RouteMatch,
    /// Lower values are checked first.
    pub priority: i32,
    pub cluster_id: String,
    /// Overrides the cluster's health-check flag for candidate selection.
    pub health_check_enabled: Option<bool>,
    pub metadata: HashMap<String, String>,
}

impl RouteInfo {
    /// Placeholder route with an empty predicate and no cluster.
    pub fn new(route_id: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            matcher: RouteMatch::default(),
            priority: 0,
            cluster_id: String::new(),
            health_check_enabled: None,
            metadata: HashMap::new(),
        }
    }

    /// Compile a validated route configuration.
    pub fn from_config(config: RouteConfig) -> Self {
        Self {
            matcher: RouteMatch::from_config(&config),
            route_id: config.route_id,
            priority: config.priority.unwrap_or(0),
            cluster_id: config.cluster_id,
            health_check_enabled: config.health_check_enabled,
            metadata: config.metadata,
        }
    }

    pub fn matches(&self, req: &RequestAttributes) -> bool {
        self.matcher.matches(req)
    }
}
