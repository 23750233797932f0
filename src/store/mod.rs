//! Shared execution store
//!
//! The persistent record of partition execution status: written by
//! workers, read by the poller, and the sole channel of cross-process
//! signaling for a run. Per-record updates are last-writer-wins on
//! `{status, failure_detail}`; each record has exactly one writer after
//! creation (the worker assigned to its partition).

pub mod error;
pub mod factory;
pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::partition::PartitionDescriptor;
use error::{StoreError, StoreResult};

/// Identifier of one coordinated run spanning all partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of one partition's execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Execution status of one partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Terminal states expect no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(StoreError::serialization(format!(
                "unknown execution status '{other}'"
            ))),
        }
    }
}

/// Persistent record of one partition's execution
///
/// Created pending by the coordinator before dispatch, flipped to
/// running by the worker on accept and to a terminal status when the
/// unit finishes. Never deleted during a run; kept for audit afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub run_id: RunId,
    pub unit_name: String,
    pub partition: PartitionDescriptor,
    pub status: ExecutionStatus,
    pub failure_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(run_id: RunId, unit_name: &str, partition: PartitionDescriptor) -> Self {
        let now = Utc::now();
        Self {
            id: ExecutionId::new(),
            run_id,
            unit_name: unit_name.to_string(),
            partition,
            status: ExecutionStatus::Pending,
            failure_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.failure_detail = Some(detail.into());
        self.updated_at = Utc::now();
    }
}

/// Access contract for the shared execution store
///
/// Must be durable and shared across processes for real deployments;
/// the in-memory backend exists for tests and single-process use.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Register a new record; fails with a conflict if the id exists
    async fn create(&self, record: &ExecutionRecord) -> StoreResult<()>;

    /// Fetch a single record by id
    async fn get(&self, id: ExecutionId) -> StoreResult<Option<ExecutionRecord>>;

    /// Fetch many records in one read; missing ids are absent from the map
    async fn get_batch(
        &self,
        ids: &[ExecutionId],
    ) -> StoreResult<HashMap<ExecutionId, ExecutionRecord>>;

    /// Overwrite an existing record; fails if the id is unknown
    async fn update(&self, record: &ExecutionRecord) -> StoreResult<()>;
}
