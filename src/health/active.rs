//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint of clusters with health checks enabled
//! - Update endpoint health state based on results
//! - Follow configuration reloads (start, restart and stop cluster tasks)
//!
//! # Design Decisions
//! - A cluster is probed when its own flag is on or when any route turns
//!   health checking on for it
//! - One task per probed cluster; one short-lived task per probe
//! - An endpoint whose previous probe is still outstanding is skipped
//! - A cluster task is only restarted when its options or membership change

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use hyper::http::{StatusCode, Uri};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::cluster::{EndpointInfo, HealthCheckOptions};
use crate::health::state::EndpointState;
use crate::health::transport::{ProbeError, ProbeTransport};
use crate::load_balancer::{EndpointPool, PoolMember};
use crate::observability::metrics;
use crate::runtime::{ConfigCoordinator, ConfigSnapshot};

/// Probes endpoints of all enabled clusters in the published snapshot.
pub struct HealthCheckEngine {
    snapshots: watch::Receiver<Arc<ConfigSnapshot>>,
    transport: Arc<dyn ProbeTransport>,
}

/// What a cluster task probes; compared on reload to decide on a restart.
#[derive(Debug, Clone)]
struct ClusterProbePlan {
    cluster_id: String,
    options: HealthCheckOptions,
    members: Vec<PoolMember>,
}

impl ClusterProbePlan {
    /// `route_enabled` is set when some route overrides health checking on
    /// for this cluster.
    fn from_pool(pool: &EndpointPool, route_enabled: bool) -> Option<Self> {
        let cluster = pool.cluster();
        if !(cluster.health_check.enabled || route_enabled) || pool.members().is_empty() {
            return None;
        }
        let mut options = cluster.health_check.clone();
        options.enabled = true;
        Some(Self {
            cluster_id: cluster.cluster_id.clone(),
            options,
            members: pool.members().to_vec(),
        })
    }

    fn for_snapshot(snapshot: &ConfigSnapshot) -> HashMap<String, Self> {
        let route_enabled = route_enabled_clusters(snapshot);
        snapshot
            .pools()
            .filter_map(|pool| {
                Self::from_pool(pool, route_enabled.contains(pool.cluster().cluster_id.as_str()))
            })
            .map(|plan| (plan.cluster_id.clone(), plan))
            .collect()
    }

    fn same_as(&self, other: &Self) -> bool {
        self.options == other.options
            && self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.endpoint == b.endpoint && Arc::ptr_eq(&a.state, &b.state))
    }
}

struct ClusterTask {
    plan: ClusterProbePlan,
    handle: JoinHandle<()>,
}

impl HealthCheckEngine {
    pub fn new(coordinator: &ConfigCoordinator, transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            snapshots: coordinator.subscribe(),
            transport,
        }
    }

    /// Supervise cluster probe tasks until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Health check engine starting");

        let mut tasks: HashMap<String, ClusterTask> = HashMap::new();
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.reconcile(&snapshot, &mut tasks);

        loop {
            tokio::select! {
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Snapshot publisher dropped, stopping health checks");
                        break;
                    }
                    let snapshot = self.snapshots.borrow_and_update().clone();
                    self.reconcile(&snapshot, &mut tasks);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health check engine received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        for (_, task) in tasks.drain() {
            task.handle.abort();
        }
    }

    fn reconcile(&self, snapshot: &ConfigSnapshot, tasks: &mut HashMap<String, ClusterTask>) {
        let plans = ClusterProbePlan::for_snapshot(snapshot);

        tasks.retain(|cluster_id, task| {
            let keep = plans.get(cluster_id).is_some_and(|plan| plan.same_as(&task.plan));
            if !keep {
                tracing::debug!(cluster_id = %cluster_id, "Stopping cluster health checks");
                task.handle.abort();
            }
            keep
        });

        for (cluster_id, plan) in plans {
            if tasks.contains_key(&cluster_id) {
                continue;
            }
            tracing::info!(
                cluster_id = %cluster_id,
                generation = snapshot.generation(),
                interval_ms = plan.options.interval.as_millis() as u64,
                path = %plan.options.path,
                endpoints = plan.members.len(),
                "Starting cluster health checks"
            );
            let handle = tokio::spawn(run_cluster(plan.clone(), self.transport.clone()));
            tasks.insert(cluster_id, ClusterTask { plan, handle });
        }
    }

    /// Probe every endpoint of a cluster once and wait for the results.
    ///
    /// Returns how many probes ran. Endpoints with a probe already in flight
    /// and clusters nothing enables health checks for are skipped.
    pub async fn check_cluster_now(&self, cluster_id: &str) -> usize {
        let snapshot = self.snapshots.borrow().clone();
        let route_enabled = route_enabled_clusters(&snapshot).contains(cluster_id);
        let Some(plan) = snapshot
            .pool(cluster_id)
            .and_then(|pool| ClusterProbePlan::from_pool(pool, route_enabled))
        else {
            return 0;
        };

        let probes = plan.members.iter().filter_map(|member| {
            let slot = ProbeSlot::acquire(&member.state)?;
            let options = &plan.options;
            let transport = self.transport.as_ref();
            Some(async move {
                probe_endpoint(options, &member.endpoint, &member.state, transport).await;
                drop(slot);
            })
        });
        join_all(probes).await.len()
    }
}

/// Clusters targeted by a route whose override turns health checking on.
fn route_enabled_clusters(snapshot: &ConfigSnapshot) -> HashSet<&str> {
    snapshot
        .routes()
        .routes()
        .iter()
        .filter(|route| route.health_check_enabled == Some(true))
        .map(|route| route.cluster_id.as_str())
        .collect()
}

async fn run_cluster(plan: ClusterProbePlan, transport: Arc<dyn ProbeTransport>) {
    let mut ticker = time::interval(plan.options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        for member in &plan.members {
            let Some(slot) = ProbeSlot::acquire(&member.state) else {
                tracing::debug!(
                    cluster_id = %plan.cluster_id,
                    endpoint_id = %member.endpoint.endpoint_id,
                    "Previous probe still in flight, skipping"
                );
                continue;
            };
            let member = member.clone();
            let options = plan.options.clone();
            let transport = transport.clone();
            tokio::spawn(async move {
                probe_endpoint(&options, &member.endpoint, &member.state, transport.as_ref()).await;
                drop(slot);
            });
        }
    }
}

/// Holds an endpoint's probe slot; released on drop.
struct ProbeSlot(Arc<EndpointState>);

impl ProbeSlot {
    fn acquire(state: &Arc<EndpointState>) -> Option<Self> {
        state.try_begin_probe().then(|| Self(state.clone()))
    }
}

impl Drop for ProbeSlot {
    fn drop(&mut self) {
        self.0.end_probe();
    }
}

/// Probe URI: endpoint base address followed by the health path.
pub fn probe_uri(endpoint: &EndpointInfo, path: &str) -> Result<Uri, ProbeError> {
    let uri = format!("{}{}", endpoint.address.as_str().trim_end_matches('/'), path);
    uri.parse().map_err(|_| ProbeError::InvalidUri(uri))
}

/// Run one probe and feed the result into the endpoint's state.
///
/// Returns whether the probe succeeded.
async fn probe_endpoint(
    options: &HealthCheckOptions,
    endpoint: &EndpointInfo,
    state: &EndpointState,
    transport: &dyn ProbeTransport,
) -> bool {
    let result: Result<StatusCode, ProbeError> = match probe_uri(endpoint, &options.path) {
        Ok(uri) => match time::timeout(options.timeout, transport.probe(uri)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        },
        Err(e) => Err(e),
    };

    let success = match &result {
        Ok(status) if status.is_success() => true,
        Ok(status) => {
            tracing::debug!(
                cluster_id = %endpoint.cluster_id,
                endpoint_id = %endpoint.endpoint_id,
                status = %status,
                "Health check failed: non-success status"
            );
            false
        }
        Err(e) => {
            tracing::debug!(
                cluster_id = %endpoint.cluster_id,
                endpoint_id = %endpoint.endpoint_id,
                error = %e,
                "Health check failed"
            );
            false
        }
    };

    let transition = if success {
        state.record_success(options.healthy_threshold)
    } else {
        state.record_failure(options.unhealthy_threshold)
    };

    metrics::record_probe(&endpoint.cluster_id, success);
    if let Some(next) = transition {
        if success {
            tracing::info!(
                cluster_id = %endpoint.cluster_id,
                endpoint_id = %endpoint.endpoint_id,
                "Endpoint marked {}",
                next
            );
        } else {
            tracing::warn!(
                cluster_id = %endpoint.cluster_id,
                endpoint_id = %endpoint.endpoint_id,
                failures = state.consecutive_failures(),
                "Endpoint marked {}",
                next
            );
        }
        metrics::record_endpoint_health(&endpoint.cluster_id, &endpoint.endpoint_id, next);
    }
    success
}
