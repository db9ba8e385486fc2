//! Configuration file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! notify event ──▶ load_config ──▶ mpsc ──▶ ConfigCoordinator::reload_on_change
//!                      │
//!                      └── error: logged, nothing sent, current snapshot kept
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;

/// Polling fallback interval for backends without native events.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Forwards parsed configuration from a file to a reload channel.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its reload channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Register the file with the platform watcher.
    ///
    /// The returned handle must be kept alive; dropping it stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, ConfigError> {
        let path = self.path.clone();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                self.on_event(&event);
            }
            Err(e) => tracing::error!(path = ?self.path, error = %e, "Config watch error"),
        };

        let mut watcher = RecommendedWatcher::new(handler, Config::default().with_poll_interval(POLL_INTERVAL))?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }

    /// Reload on writes and re-creation. Returns whether a configuration
    /// was sent.
    fn on_event(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return false;
        }
        self.reload()
    }

    fn reload(&self) -> bool {
        tracing::info!(path = ?self.path, "Config file change detected, reloading");
        match load_config(&self.path) {
            Ok(config) => {
                if self.update_tx.send(config).is_err() {
                    tracing::debug!(path = ?self.path, "Config receiver dropped, ignoring change");
                    return false;
                }
                true
            }
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                false
            }
        }
    }
}
