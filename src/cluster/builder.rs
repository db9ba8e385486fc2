//! Cluster construction from raw configuration.

use std::sync::Arc;

use url::Url;

use crate::cluster::{ClusterInfo, EndpointInfo, HealthCheckOptions};
use crate::config::hooks::ConfigHooks;
use crate::config::schema::ClusterConfig;
use crate::config::validation::{check_cluster_ids, validate_cluster, ValidationError};
use crate::store::ClusterStore;

/// Build one cluster: run the hook stages, validate, then freeze.
pub fn build_cluster(raw: ClusterConfig, hooks: &ConfigHooks) -> Result<ClusterInfo, Vec<ValidationError>> {
    let cluster = hooks.apply_cluster(raw);

    let errors = validate_cluster(&cluster);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut endpoints = Vec::with_capacity(cluster.endpoints.len());
    for endpoint in &cluster.endpoints {
        let address = Url::parse(&endpoint.address).map_err(|_| {
            vec![ValidationError::InvalidAddress {
                cluster_id: cluster.cluster_id.clone(),
                endpoint_id: endpoint.endpoint_id.clone(),
                address: endpoint.address.clone(),
            }]
        })?;
        endpoints.push(Arc::new(EndpointInfo {
            endpoint_id: endpoint.endpoint_id.clone(),
            cluster_id: cluster.cluster_id.clone(),
            address,
            weight: endpoint.weight,
        }));
    }

    let health_check = cluster
        .health_check
        .as_ref()
        .map(HealthCheckOptions::from)
        .unwrap_or_default();

    Ok(ClusterInfo {
        cluster_id: cluster.cluster_id,
        endpoints,
        health_check,
        load_balancing: cluster.load_balancing,
        metadata: cluster.metadata,
    })
}

/// Build every cluster into a fresh store, collecting all errors.
pub fn build_clusters(raw: Vec<ClusterConfig>, hooks: &ConfigHooks) -> Result<ClusterStore, Vec<ValidationError>> {
    let mut errors = check_cluster_ids(&raw);
    let store = ClusterStore::empty();

    for cluster in raw {
        match build_cluster(cluster, hooks) {
            Ok(info) => {
                let id = info.cluster_id.clone();
                store.insert(id, info);
            }
            Err(mut e) => errors.append(&mut e),
        }
    }

    if errors.is_empty() {
        Ok(store)
    } else {
        Err(errors)
    }
}
