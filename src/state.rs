//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::storage::BlobStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    storage: BlobStore,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool, storage: BlobStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                storage,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the blob store
    pub fn storage(&self) -> &BlobStore {
        &self.inner.storage
    }
}
