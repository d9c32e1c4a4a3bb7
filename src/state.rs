use std::sync::Arc;

use crate::config::Config;
use crate::db::{MemoryStore, ProgressStore, SqliteStore, StoreError};
use crate::progress::{ProgressEngine, ProgressPolicy};

#[derive(Clone)]
pub struct AppState {
    engine: Arc<ProgressEngine>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProgressStore>, policy: ProgressPolicy) -> Self {
        Self {
            engine: Arc::new(ProgressEngine::new(store, policy)),
        }
    }

    /// SQLite when a database path is configured, otherwise an in-memory store.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store: Arc<dyn ProgressStore> = match config.database_path {
            Some(ref path) => {
                tracing::info!(path = %path.display(), "opening sqlite store");
                Arc::new(SqliteStore::open(path).await?)
            }
            None => {
                tracing::warn!("DATABASE_PATH not set, progress is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, config.policy.clone()))
    }

    pub fn engine(&self) -> &ProgressEngine {
        &self.engine
    }

    pub fn store(&self) -> &dyn ProgressStore {
        self.engine.store().as_ref()
    }
}
