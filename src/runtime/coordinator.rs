//! Configuration coordinator: validates, builds and publishes snapshots.
//!
//! # Responsibilities
//! - Turn a raw `ProxyConfig` into a `ConfigSnapshot` (hooks, validation)
//! - Publish snapshots atomically with a strictly increasing generation
//! - Keep endpoint state across reloads and drop it for removed endpoints
//! - Notify subscribers (health engine) of every published snapshot
//!
//! # Design Decisions
//! - Readers never lock: `ArcSwap::load_full` on the request path
//! - Writers are serialised by a mutex; a rejected config leaves the
//!   current snapshot and generation untouched

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::hooks::ConfigHooks;
use crate::config::loader::ConfigError;
use crate::config::schema::ProxyConfig;
use crate::health::state::{EndpointStates, SharedEndpointStates};
use crate::observability::metrics;
use crate::runtime::snapshot::ConfigSnapshot;

/// Owner of the current configuration snapshot.
pub struct ConfigCoordinator {
    current: ArcSwap<ConfigSnapshot>,
    states: SharedEndpointStates,
    hooks: ConfigHooks,
    write_lock: Mutex<()>,
    tx: watch::Sender<Arc<ConfigSnapshot>>,
}

impl ConfigCoordinator {
    /// Start at generation 0 with an empty snapshot.
    pub fn new(hooks: ConfigHooks) -> Self {
        let initial = Arc::new(ConfigSnapshot::empty());
        let (tx, _) = watch::channel(initial.clone());

        Self {
            current: ArcSwap::new(initial),
            states: Arc::new(EndpointStates::empty()),
            hooks,
            write_lock: Mutex::new(()),
            tx,
        }
    }

    /// Validate and publish a new configuration.
    ///
    /// Returns the new generation. On failure nothing is published and the
    /// previous snapshot keeps serving.
    pub fn apply(&self, config: ProxyConfig) -> Result<u64, ConfigError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.current.load_full();
        let generation = current.generation() + 1;

        let snapshot = match ConfigSnapshot::build(generation, config, &self.hooks, &self.states) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(errors) => {
                let err = ConfigError::Validation(errors);
                tracing::error!(
                    generation = current.generation(),
                    error = %err,
                    "Configuration rejected, keeping current snapshot"
                );
                metrics::record_config_reload(false);
                return Err(err);
            }
        };

        self.current.store(snapshot.clone());

        // Old snapshots still hold their own Arc<EndpointState>; this only
        // stops the registry from handing removed endpoints' state out again.
        let live = snapshot.endpoint_keys();
        self.states.retain(|key| live.contains(key));

        tracing::info!(
            generation,
            routes = snapshot.routes().len(),
            clusters = snapshot.clusters().len(),
            "Configuration applied"
        );
        metrics::record_config_reload(true);
        metrics::record_generation(generation);

        self.tx.send_replace(snapshot);
        Ok(generation)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Receive every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.tx.subscribe()
    }

    /// Endpoint state registry.
    pub fn states(&self) -> &SharedEndpointStates {
        &self.states
    }

    pub fn hooks(&self) -> &ConfigHooks {
        &self.hooks
    }

    /// Apply configurations from a channel (typically a `ConfigWatcher`)
    /// until the channel closes or shutdown is signalled.
    pub async fn reload_on_change(
        self: Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else {
                        tracing::debug!("Config update channel closed");
                        break;
                    };
                    // Rejections are logged inside apply.
                    let _ = self.apply(config);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config reload loop received shutdown signal, exiting");
                    break;
                }
            }
        }
    }
}

impl Default for ConfigCoordinator {
    fn default() -> Self {
        Self::new(ConfigHooks::default())
    }
}

impl std::fmt::Debug for ConfigCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCoordinator")
            .field("generation", &self.generation())
            .field("endpoint_states", &self.states.len())
            .finish()
    }
}
