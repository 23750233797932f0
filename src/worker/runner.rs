//! Partition execution on the worker side
//!
//! Runs on its own tokio task after the start endpoint has already
//! acknowledged. Every outcome, success or failure, is signaled through
//! the store; nothing propagates past the task boundary.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::store::{ExecutionRecord, ExecutionStore};

use super::registry::WorkUnit;

/// Execute one partition's unit and record the terminal status
pub async fn execute_partition(
    store: Arc<dyn ExecutionStore>,
    unit: Arc<dyn WorkUnit>,
    mut record: ExecutionRecord,
) {
    record.mark_running();
    if let Err(e) = store.update(&record).await {
        // The run can still converge on the terminal write below
        warn!(execution_id = %record.id, "failed to persist running status: {e}");
    }

    match unit.execute(&record).await {
        Ok(()) => {
            info!(
                execution_id = %record.id,
                partition = record.partition.index,
                "partition completed"
            );
            record.mark_completed();
        }
        Err(e) => {
            warn!(
                execution_id = %record.id,
                partition = record.partition.index,
                "partition failed: {e:#}"
            );
            record.mark_failed(format!("{e:#}"));
        }
    }

    if let Err(e) = store.update(&record).await {
        // Without the terminal write the poller will run out the
        // deadline; nothing else can be done from here.
        error!(execution_id = %record.id, "failed to persist terminal status: {e}");
    }
}
