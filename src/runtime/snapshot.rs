//! Immutable configuration snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cluster::{build_clusters, ClusterInfo};
use crate::config::hooks::ConfigHooks;
use crate::config::schema::ProxyConfig;
use crate::config::validation::{check_references, ValidationError};
use crate::health::state::{EndpointKey, EndpointStates};
use crate::load_balancer::EndpointPool;
use crate::routing::RouteTable;
use crate::store::ClusterStore;

/// One generation of routing and cluster state.
///
/// Built once, then only read. Requests hold an `Arc` to the snapshot they
/// resolved against, so an in-flight request never sees a half-applied
/// configuration.
#[derive(Debug)]
pub struct ConfigSnapshot {
    generation: u64,
    routes: RouteTable,
    clusters: ClusterStore,
    pools: HashMap<String, EndpointPool>,
}

impl ConfigSnapshot {
    /// Generation 0: no routes, no clusters.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            routes: RouteTable::empty(),
            clusters: ClusterStore::empty(),
            pools: HashMap::new(),
        }
    }

    /// Run hooks, validate and compile a full configuration.
    ///
    /// Endpoint states are only touched once every check has passed, so a
    /// rejected configuration leaves `states` unchanged.
    pub fn build(
        generation: u64,
        config: ProxyConfig,
        hooks: &ConfigHooks,
        states: &EndpointStates,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let routes = RouteTable::build(config.routes, hooks).map_err(|mut e| errors.append(&mut e));
        let clusters = build_clusters(config.clusters, hooks).map_err(|mut e| errors.append(&mut e));

        let (routes, clusters) = match (routes, clusters) {
            (Ok(routes), Ok(clusters)) => (routes, clusters),
            _ => return Err(errors),
        };

        let cluster_ids = clusters.ids();
        let references = routes
            .routes()
            .iter()
            .map(|r| (r.route_id.as_str(), r.cluster_id.as_str()));
        let errors = check_references(references, cluster_ids.iter().map(String::as_str));
        if !errors.is_empty() {
            return Err(errors);
        }

        let pools = clusters
            .get_all()
            .into_iter()
            .map(|cluster| (cluster.cluster_id.clone(), EndpointPool::new(cluster, states)))
            .collect();

        Ok(Self {
            generation,
            routes,
            clusters,
            pools,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn clusters(&self) -> &ClusterStore {
        &self.clusters
    }

    pub fn cluster(&self, cluster_id: &str) -> Option<Arc<ClusterInfo>> {
        self.clusters.get(cluster_id)
    }

    pub fn pool(&self, cluster_id: &str) -> Option<&EndpointPool> {
        self.pools.get(cluster_id)
    }

    pub fn pools(&self) -> impl Iterator<Item = &EndpointPool> {
        self.pools.values()
    }

    /// Every endpoint state key this snapshot references.
    pub fn endpoint_keys(&self) -> HashSet<EndpointKey> {
        self.pools
            .values()
            .flat_map(|pool| pool.members().iter())
            .map(|m| EndpointKey::new(m.endpoint.cluster_id.clone(), m.endpoint.endpoint_id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ClusterConfig, EndpointConfig, RouteConfig};

    fn config() -> ProxyConfig {
        ProxyConfig {
            routes: vec![RouteConfig {
                route_id: "r1".into(),
                path: Some("/api/*".into()),
                cluster_id: "c1".into(),
                ..Default::default()
            }],
            clusters: vec![ClusterConfig {
                cluster_id: "c1".into(),
                endpoints: vec![
                    EndpointConfig::new("A", "http://127.0.0.1:9001"),
                    EndpointConfig::new("B", "http://127.0.0.1:9002"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_build_snapshot() {
        let states = EndpointStates::empty();
        let snapshot = ConfigSnapshot::build(1, config(), &ConfigHooks::new(), &states).unwrap();

        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.routes().len(), 1);
        assert_eq!(snapshot.pool("c1").unwrap().members().len(), 2);
        assert_eq!(snapshot.endpoint_keys().len(), 2);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn test_unknown_cluster_rejected_without_touching_states() {
        let states = EndpointStates::empty();
        let mut cfg = config();
        cfg.routes[0].cluster_id = "missing".into();

        let errors = ConfigSnapshot::build(1, cfg, &ConfigHooks::new(), &states).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::UnknownCluster { cluster_id, .. } if cluster_id == "missing"));
        assert!(states.is_empty());
    }

    #[test]
    fn test_route_and_cluster_errors_collected_together() {
        let states = EndpointStates::empty();
        let mut cfg = config();
        cfg.routes.push(cfg.routes[0].clone());
        cfg.clusters.push(cfg.clusters[0].clone());

        let errors = ConfigSnapshot::build(1, cfg, &ConfigHooks::new(), &states).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateRoute("r1".into())));
        assert!(errors.contains(&ValidationError::DuplicateCluster("c1".into())));
    }

    #[test]
    fn test_code_route_must_reference_known_cluster() {
        let states = EndpointStates::empty();
        let hooks = ConfigHooks::new().add_code_route(RouteConfig {
            route_id: "code".into(),
            cluster_id: "ghost".into(),
            ..Default::default()
        });
        assert!(ConfigSnapshot::build(1, config(), &hooks, &states).is_err());
    }
}
