use std::path::PathBuf;
use std::sync::Arc;

use pyro_db::Database;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::session::{SessionLocks, StateStore, Throttle};

/// Application shared state accessible from axum handlers and services.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    /// Application configuration
    config: RwLock<AppConfig>,
    /// Database handle
    db: Database,
    /// Data directory path
    data_dir: PathBuf,
    /// Serialises state updates per session
    locks: SessionLocks,
    /// Rate limit for mutating requests
    throttle: Throttle,
}

impl SharedState {
    /// Create shared state from an already-opened database and loaded config.
    pub fn new(db: Database, config: AppConfig, data_dir: PathBuf) -> Self {
        let throttle = Throttle::new(config.throttle);
        Self {
            inner: Arc::new(SharedStateInner {
                config: RwLock::new(config),
                db,
                data_dir,
                locks: SessionLocks::new(),
                throttle,
            }),
        }
    }

    pub fn server_port(&self) -> u16 {
        // Read from config; fallback to 8080.
        self.inner
            .config
            .try_read()
            .map(|c| c.server_port)
            .unwrap_or(8080)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner
            .config
            .try_read()
            .map(|c| c.max_upload_bytes)
            .unwrap_or(20 * 1024 * 1024)
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Session state persistence.
    pub fn store(&self) -> &dyn StateStore {
        &self.inner.db
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }

    pub fn locks(&self) -> &SessionLocks {
        &self.inner.locks
    }

    pub fn throttle(&self) -> &Throttle {
        &self.inner.throttle
    }

    /// Get a read lock on the current config.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.config.read().await
    }
}
