//! In-memory store backend for testing and single-process runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{StoreError, StoreResult};
use super::{ExecutionId, ExecutionRecord, ExecutionStore};

/// In-memory execution store
#[derive(Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<ExecutionId, ExecutionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::conflict(format!(
                "execution record already exists: {}",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: ExecutionId) -> StoreResult<Option<ExecutionRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn get_batch(
        &self,
        ids: &[ExecutionId],
    ) -> StoreResult<HashMap<ExecutionId, ExecutionRecord>> {
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|record| (*id, record.clone())))
            .collect())
    }

    async fn update(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if !records.contains_key(&record.id) {
            return Err(StoreError::not_found(format!(
                "execution record not found: {}",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }
}
