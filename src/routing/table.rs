//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Match order is fixed at build time; the first passing route wins
//! - O(n) predicate scan (acceptable for typical route counts)
//!
//! # Tie-break
//! Routes are ordered by, in turn:
//! 1. priority (lower first)
//! 2. path specificity (exact, then longer prefix, then no path)
//! 3. host specificity (exact, then wildcard, then any host)
//! 4. number of method/header/query conditions (more first)
//! 5. route id (lexical)

use std::cmp::Reverse;
use std::sync::Arc;

use crate::config::hooks::ConfigHooks;
use crate::config::schema::RouteConfig;
use crate::config::validation::{check_route_ids, validate_route, ValidationError};
use crate::routing::request::RequestAttributes;
use crate::routing::route::RouteInfo;
use crate::store::RouteStore;

/// Ordered, immutable set of routes.
#[derive(Debug)]
pub struct RouteTable {
    store: RouteStore,
    ordered: Vec<Arc<RouteInfo>>,
}

impl RouteTable {
    /// Run route hooks, validate and compile a full route set.
    ///
    /// Code-defined routes registered on `hooks` are included.
    pub fn build(routes: Vec<RouteConfig>, hooks: &ConfigHooks) -> Result<Self, Vec<ValidationError>> {
        let routes = hooks.apply_routes(routes);

        let mut errors = check_route_ids(&routes);
        for route in &routes {
            errors.extend(validate_route(route));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Self::from_routes(routes.into_iter().map(RouteInfo::from_config).collect())
    }

    /// Order already-compiled routes. Fails on duplicate ids.
    pub fn from_routes(routes: Vec<RouteInfo>) -> Result<Self, Vec<ValidationError>> {
        let store = RouteStore::empty();
        let mut errors = Vec::new();
        let mut ordered = Vec::with_capacity(routes.len());

        for route in routes {
            if store.contains(route.route_id.as_str()) {
                errors.push(ValidationError::DuplicateRoute(route.route_id.clone()));
                continue;
            }
            ordered.push(store.insert(route.route_id.clone(), route));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        ordered.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        Ok(Self { store, ordered })
    }

    /// An empty table; every request misses.
    pub fn empty() -> Self {
        Self {
            store: RouteStore::empty(),
            ordered: Vec::new(),
        }
    }

    /// First route, in tie-break order, whose predicate passes.
    pub fn match_request(&self, req: &RequestAttributes) -> Option<&Arc<RouteInfo>> {
        self.ordered.iter().find(|route| route.matches(req))
    }

    pub fn get(&self, route_id: &str) -> Option<Arc<RouteInfo>> {
        self.store.get(route_id)
    }

    /// All routes in match order.
    pub fn routes(&self) -> &[Arc<RouteInfo>] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

type SortKey<'a> = (i32, Reverse<(u8, usize)>, Reverse<u8>, Reverse<usize>, &'a str);

fn sort_key(route: &RouteInfo) -> SortKey<'_> {
    (
        route.priority,
        Reverse(route.matcher.path_specificity()),
        Reverse(route.matcher.host_specificity()),
        Reverse(route.matcher.condition_count()),
        route.route_id.as_str(),
    )
}
