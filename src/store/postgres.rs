//! PostgreSQL store backend
//!
//! Indexed columns carry what the poller filters on; the full record is
//! kept as a JSONB document so the row round-trips without a column per
//! field.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::{ExecutionId, ExecutionRecord, ExecutionStore};

/// PostgreSQL execution store
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and make sure the records table exists
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        info!("Connecting execution store to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::database(format!("failed to connect: {e}")))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS execution_records (
                id UUID PRIMARY KEY,
                run_id UUID NOT NULL,
                status VARCHAR(20) NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ DEFAULT NOW(),
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("failed to create records table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_execution_records_run ON execution_records (run_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("failed to create run index: {e}")))?;

        Ok(())
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<ExecutionRecord> {
        let data: JsonValue = row.get("data");
        serde_json::from_value(data).map_err(|e| StoreError::serialization(e))
    }
}

#[async_trait]
impl ExecutionStore for PostgresStore {
    async fn create(&self, record: &ExecutionRecord) -> StoreResult<()> {
        debug!("Creating execution record {}", record.id);

        let data = serde_json::to_value(record)?;
        let result = sqlx::query(
            r#"
            INSERT INTO execution_records (id, run_id, status, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id.0)
        .bind(record.run_id.0)
        .bind(record.status.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict(format!(
                "execution record already exists: {}",
                record.id
            )));
        }
        Ok(())
    }

    async fn get(&self, id: ExecutionId) -> StoreResult<Option<ExecutionRecord>> {
        let row = sqlx::query("SELECT data FROM execution_records WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(e.to_string()))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn get_batch(
        &self,
        ids: &[ExecutionId],
    ) -> StoreResult<HashMap<ExecutionId, ExecutionRecord>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query("SELECT data FROM execution_records WHERE id = ANY($1)")
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(e.to_string()))?;

        let mut batch = HashMap::with_capacity(rows.len());
        for row in &rows {
            let record = Self::record_from_row(row)?;
            batch.insert(record.id, record);
        }
        Ok(batch)
    }

    async fn update(&self, record: &ExecutionRecord) -> StoreResult<()> {
        debug!("Updating execution record {} -> {}", record.id, record.status);

        let data = serde_json::to_value(record)?;
        let result = sqlx::query(
            r#"
            UPDATE execution_records
            SET status = $2, data = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record.id.0)
        .bind(record.status.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "execution record not found: {}",
                record.id
            )));
        }
        Ok(())
    }
}
