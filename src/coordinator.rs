//! Run coordination
//!
//! Ties the planner, dispatcher and poller together: plan one partition
//! per configured worker, pre-register a pending record for each,
//! fire the start requests and poll the store for the outcome.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, WorkerTarget};
use crate::error::{Error, Result};
use crate::partition;
use crate::poller::{CompletionPoller, PollOutcome};
use crate::store::{ExecutionId, ExecutionRecord, ExecutionStatus, ExecutionStore, RunId};

/// Final account of one coordinated run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: PollOutcome,
    /// Per-partition dispatch results, in partition order
    pub dispatch: Vec<DispatchOutcome>,
    /// Final records as last read from the store, in partition order
    pub records: Vec<ExecutionRecord>,
    pub elapsed: Duration,
}

impl RunReport {
    /// True when every partition dispatched, ran and completed in time
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, PollOutcome::Completed { .. })
            && self
                .records
                .iter()
                .all(|r| r.status == ExecutionStatus::Completed)
    }
}

/// Coordinates partitioned runs across a fixed set of remote workers
pub struct Coordinator {
    store: Arc<dyn ExecutionStore>,
    dispatcher: Dispatcher,
    poller: CompletionPoller,
    targets: Vec<WorkerTarget>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn ExecutionStore>, config: &RunConfig) -> Result<Self> {
        let targets = config.targets();
        if targets.is_empty() {
            return Err(Error::Config(
                "at least one worker target is required".to_string(),
            ));
        }
        let dispatcher = Dispatcher::new(store.clone())?;
        let poller = CompletionPoller::new(store.clone(), config.poll_interval, config.deadline);
        Ok(Self {
            store,
            dispatcher,
            poller,
            targets,
        })
    }

    /// Execute one coordinated run of `unit_name` across all workers.
    ///
    /// Partition count equals the configured worker count; each target
    /// owns the partition at its position in the list.
    pub async fn run(&self, unit_name: &str) -> Result<RunReport> {
        let started = Instant::now();
        let count = self.targets.len() as u32;
        let descriptors = partition::plan(count)?;
        let run_id = RunId::new();

        info!(%run_id, partitions = count, unit = unit_name, "starting coordinated run");

        // Records go into the store pending before any dispatch, so
        // workers and poller can resolve them from the first moment
        let mut records = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let record = ExecutionRecord::new(run_id, unit_name, *descriptor);
            self.store.create(&record).await?;
            records.push(record);
        }

        let dispatch = self
            .dispatcher
            .dispatch(&descriptors, &self.targets, &mut records)
            .await?;

        let ids: Vec<ExecutionId> = records.iter().map(|r| r.id).collect();
        let outcome = self.poller.await_completion(&ids).await?;

        match &outcome {
            PollOutcome::Completed { statuses } => {
                let failed = statuses
                    .values()
                    .filter(|s| **s == ExecutionStatus::Failed)
                    .count();
                if failed == 0 {
                    info!(%run_id, "run completed");
                } else {
                    warn!(%run_id, failed, "run finished with failed partitions");
                }
            }
            PollOutcome::TimedOutWithOrphans { orphans, .. } => {
                warn!(
                    %run_id,
                    orphans = orphans.len(),
                    "run timed out; orphaned workers keep running unmanaged"
                );
            }
        }

        // Re-read for the report so failure details are the final ones
        let batch = self.store.get_batch(&ids).await?;
        let records: Vec<ExecutionRecord> = records
            .into_iter()
            .map(|local| batch.get(&local.id).cloned().unwrap_or(local))
            .collect();

        Ok(RunReport {
            run_id,
            outcome,
            dispatch,
            records,
            elapsed: started.elapsed(),
        })
    }
}
