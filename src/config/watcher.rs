//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Events are handled on notify's thread; the
    /// returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Settings that changed between two configurations but are only read at
/// startup. Used to warn that a restart is needed.
pub fn restart_required(current: &ProxyConfig, next: &ProxyConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if current.listener != next.listener {
        changed.push("listener");
    }
    if current.upstream.default_path != next.upstream.default_path
        || current.upstream.qps != next.upstream.qps
        || current.upstream.request_timeout_ms != next.upstream.request_timeout_ms
    {
        changed.push("upstream");
    }
    if current.breaker != next.breaker {
        changed.push("breaker");
    }
    if current.retries != next.retries {
        changed.push("retries");
    }
    if current.timeouts != next.timeouts {
        changed.push("timeouts");
    }
    if current.observability != next.observability {
        changed.push("observability");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_change_needs_no_restart() {
        let current = ProxyConfig::default();
        let mut next = current.clone();
        next.upstream.instances = "a.test:9000".into();
        assert!(restart_required(&current, &next).is_empty());
    }

    #[test]
    fn test_startup_only_changes_are_reported() {
        let current = ProxyConfig::default();
        let mut next = current.clone();
        next.upstream.qps = 5;
        next.retries.max_attempts = 7;
        assert_eq!(restart_required(&current, &next), vec!["upstream", "retries"]);
    }
}
