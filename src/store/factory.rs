//! Factory mapping store configuration to a backend instance

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

use super::error::{StoreError, StoreResult};
use super::file::FileStore;
use super::memory::MemoryStore;
use super::ExecutionStore;

/// Factory for creating execution store instances
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store from explicit configuration
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn ExecutionStore>> {
        match config.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::File => {
                let store = FileStore::new(config.path.clone()).await?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "postgres")]
            StoreBackend::Postgres => {
                let url = config.url.as_deref().ok_or_else(|| {
                    StoreError::configuration("postgres backend requires a store url")
                })?;
                let store = super::postgres::PostgresStore::connect(url, config.pool_size).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            StoreBackend::Postgres => Err(StoreError::configuration(
                "postgres backend not enabled; rebuild with --features postgres",
            )),
        }
    }
}
