//! Poll-based discovery of partition completion
//!
//! The poller is the only consumer of worker outcomes: it re-reads the
//! shared store at a fixed interval until every partition is terminal
//! or the deadline passes. There is no cancellation path back to the
//! workers; a timeout leaves already-running partitions orphaned, and
//! the result names them instead of papering over it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{ExecutionId, ExecutionStatus, ExecutionStore};

/// Outcome of waiting for a run's partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Every partition reached a terminal state within the deadline
    Completed {
        statuses: HashMap<ExecutionId, ExecutionStatus>,
    },
    /// The deadline elapsed first; the listed partitions never went
    /// terminal and keep running unmanaged on their workers
    TimedOutWithOrphans {
        statuses: HashMap<ExecutionId, ExecutionStatus>,
        orphans: Vec<ExecutionId>,
    },
}

/// Polls the shared store until all partitions are terminal or a
/// deadline elapses
pub struct CompletionPoller {
    store: Arc<dyn ExecutionStore>,
    poll_interval: Duration,
    deadline: Duration,
}

impl CompletionPoller {
    pub fn new(store: Arc<dyn ExecutionStore>, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            store,
            poll_interval,
            deadline,
        }
    }

    /// Wait for every listed execution record to reach a terminal state.
    ///
    /// Statuses are read fresh from the store on every iteration; the
    /// terminal check runs before the deadline check, so a run that
    /// becomes terminal exactly on the deadline tick still completes.
    pub async fn await_completion(&self, ids: &[ExecutionId]) -> Result<PollOutcome> {
        if ids.is_empty() {
            return Ok(PollOutcome::Completed {
                statuses: HashMap::new(),
            });
        }

        let started = Instant::now();
        loop {
            let batch = self.store.get_batch(ids).await?;
            // A record missing from the batch has not reached the store
            // yet and counts as non-terminal.
            let statuses: HashMap<ExecutionId, ExecutionStatus> = ids
                .iter()
                .map(|id| {
                    let status = batch
                        .get(id)
                        .map(|record| record.status)
                        .unwrap_or(ExecutionStatus::Pending);
                    (*id, status)
                })
                .collect();

            let terminal = statuses.values().filter(|s| s.is_terminal()).count();
            debug!(
                terminal,
                total = ids.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "completion poll"
            );

            if terminal == ids.len() {
                return Ok(PollOutcome::Completed { statuses });
            }

            if started.elapsed() >= self.deadline {
                let orphans: Vec<ExecutionId> = ids
                    .iter()
                    .filter(|id| !statuses[id].is_terminal())
                    .copied()
                    .collect();
                warn!(
                    orphans = orphans.len(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "deadline elapsed; leaving non-terminal partitions unmanaged"
                );
                return Ok(PollOutcome::TimedOutWithOrphans { statuses, orphans });
            }

            sleep(self.poll_interval).await;
        }
    }
}
