use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use veda_db::Database;

use crate::config::{AppConfig, SettingsManager};
use crate::events;
use crate::inbox::NotificationCenter;

/// Application shared state, constructed once at startup by the
/// application root and torn down by drop on sign-out.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    /// Broadcast channel for UI events
    events_tx: broadcast::Sender<String>,
    /// Application configuration (reloadable)
    config: RwLock<AppConfig>,
    /// Database handle
    db: Database,
    /// Data directory path
    data_dir: PathBuf,
    /// Notification inbox, loaded from the persisted history
    notifications: NotificationCenter,
}

impl SharedState {
    /// Create shared state from an already-opened database and loaded config.
    pub fn new(db: Database, config: AppConfig, data_dir: PathBuf) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let notifications = NotificationCenter::load(db.clone(), events_tx.clone());

        Self {
            inner: Arc::new(SharedStateInner {
                events_tx,
                config: RwLock::new(config),
                db,
                data_dir,
                notifications,
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.inner.notifications
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<String> {
        self.inner.events_tx.subscribe()
    }

    pub fn emit_event<T: serde::Serialize>(&self, event: &str, payload: T) {
        events::emit(&self.inner.events_tx, event, payload);
    }

    /// Get a read lock on the current config.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.config.read().await
    }

    /// Reload config from the database.
    pub async fn reload_config(&self) -> Result<(), anyhow::Error> {
        let sm = SettingsManager::new(self.inner.db.clone());
        let mut config = self.inner.config.write().await;
        config.reload(&sm)?;
        Ok(())
    }
}
