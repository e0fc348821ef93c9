//! Configuration file watcher for hot reload.
//!
//! Every change to the watched file is loaded and validated before it is
//! handed to the server; a broken edit leaves the running table untouched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload_from(&path, &tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(path = %path.display(), error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and publish it. Returns whether a configuration was sent.
fn reload_from(path: &Path, tx: &mpsc::UnboundedSender<GatewayConfig>) -> bool {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), routes = config.routes.len(), "Config change detected");
            tx.send(config).is_ok()
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Config reload failed, keeping current configuration"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gateway-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_valid_change_is_published() {
        let path = temp_config(
            r#"
[[routes]]
id = "billing-service"
path = "/api/v1/billing"
service = "billing-service"
"#,
        );
        let (watcher, mut rx) = ConfigWatcher::new(&path);

        assert!(reload_from(&watcher.path, &watcher.update_tx));
        let config = rx.try_recv().unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].id, "billing-service");

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_change_is_dropped() {
        let path = temp_config(
            r#"
[[routes]]
id = "billing-service"
path = "/api/v1/billing"
service = "billing-service"
breaker = "missing"
"#,
        );
        let (watcher, mut rx) = ConfigWatcher::new(&path);

        assert!(!reload_from(&watcher.path, &watcher.update_tx));
        assert!(rx.try_recv().is_err());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_dropped() {
        let path = std::env::temp_dir().join(format!("gateway-{}.toml", uuid::Uuid::new_v4()));
        let (watcher, mut rx) = ConfigWatcher::new(&path);

        assert!(!reload_from(&watcher.path, &watcher.update_tx));
        assert!(rx.try_recv().is_err());
    }
}
