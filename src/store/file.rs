//! File-based store backend
//!
//! One JSON document per execution record under `<base_dir>/records/`.
//! Suitable for coordinator and workers sharing a filesystem; use the
//! postgres backend when processes span hosts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::{StoreError, StoreResult};
use super::{ExecutionId, ExecutionRecord, ExecutionStore};

/// File-based execution store
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at `base_dir`, creating it if needed
    pub async fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(base_dir.join("records")).await?;
        Ok(Self { base_dir })
    }

    fn record_path(&self, id: ExecutionId) -> PathBuf {
        self.base_dir.join("records").join(format!("{id}.json"))
    }

    async fn read_record(&self, path: &Path) -> StoreResult<Option<ExecutionRecord>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        serde_json::from_str(&content).map_err(|e| StoreError::serialization(e))
    }

    // Write through a temp file and rename so a concurrent reader never
    // observes a partially written record.
    async fn write_record(&self, path: &Path, record: &ExecutionRecord) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for FileStore {
    async fn create(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let path = self.record_path(record.id);
        let content = serde_json::to_string_pretty(record)?;
        // Exclusive create claims the id before the body is written
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(content.as_bytes()).await?;
                file.flush().await?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(StoreError::conflict(
                format!("execution record already exists: {}", record.id),
            )),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn get(&self, id: ExecutionId) -> StoreResult<Option<ExecutionRecord>> {
        self.read_record(&self.record_path(id)).await
    }

    async fn get_batch(
        &self,
        ids: &[ExecutionId],
    ) -> StoreResult<HashMap<ExecutionId, ExecutionRecord>> {
        let mut batch = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.read_record(&self.record_path(*id)).await? {
                batch.insert(*id, record);
            }
        }
        Ok(batch)
    }

    async fn update(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let path = self.record_path(record.id);
        if fs::metadata(&path).await.is_err() {
            return Err(StoreError::not_found(format!(
                "execution record not found: {}",
                record.id
            )));
        }
        self.write_record(&path, record).await
    }
}
