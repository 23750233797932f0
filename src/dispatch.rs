//! Fire-and-forget dispatch of partition start requests
//!
//! One HTTP POST per partition, single attempt, no backoff. A rejected
//! dispatch (non-success response or transport failure) marks its
//! record FAILED in the store synchronously, so the poller can never
//! confuse "failed to start" with "not yet started". Discovery of
//! everything after a successful send is left entirely to the poller.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::partition::PartitionDescriptor;
use crate::store::{ExecutionRecord, ExecutionStore};

/// Path of the worker start endpoint, relative to a target's base URL
pub const START_WORKER_PATH: &str = "/start-worker";

/// Network location of the worker owning one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTarget {
    pub base_url: String,
}

/// Result of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The worker acknowledged the start request
    Accepted,
    /// The request failed; the record was marked FAILED with this reason
    Rejected(String),
}

/// Sends start requests to the workers owning each partition
pub struct Dispatcher {
    client: Client,
    store: Arc<dyn ExecutionStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, store })
    }

    /// Dispatch one start request per (descriptor, target, record) triple,
    /// in order. Length mismatch aborts before any network call.
    pub async fn dispatch(
        &self,
        descriptors: &[PartitionDescriptor],
        targets: &[WorkerTarget],
        records: &mut [ExecutionRecord],
    ) -> Result<Vec<DispatchOutcome>> {
        if descriptors.len() != targets.len() || targets.len() != records.len() {
            return Err(Error::ConfigurationMismatch {
                descriptors: descriptors.len(),
                targets: targets.len(),
                records: records.len(),
            });
        }

        let mut outcomes = Vec::with_capacity(records.len());
        for (target, record) in targets.iter().zip(records.iter_mut()) {
            let outcome = self.send_start_request(target, record).await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn send_start_request(
        &self,
        target: &WorkerTarget,
        record: &mut ExecutionRecord,
    ) -> Result<DispatchOutcome> {
        let url = format!("{}{}", target.base_url.trim_end_matches('/'), START_WORKER_PATH);
        debug!(
            partition = record.partition.index,
            execution_id = %record.id,
            %url,
            "sending start request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[
                ("run_id", record.run_id.to_string()),
                ("execution_id", record.id.to_string()),
                ("unit", record.unit_name.clone()),
            ])
            .send()
            .await;

        let reason = match response {
            Ok(response) if response.status().is_success() => {
                return Ok(DispatchOutcome::Accepted);
            }
            Ok(response) => format!(
                "start request to {url} returned status {}",
                response.status()
            ),
            Err(e) => format!("start request to {url} failed: {e}"),
        };

        // The only local compensation: the record goes terminal now so the
        // poller sees FAILED instead of waiting out the deadline.
        warn!(
            partition = record.partition.index,
            execution_id = %record.id,
            %reason,
            "dispatch rejected, marking partition failed"
        );
        record.mark_failed(reason.clone());
        self.store.update(record).await?;
        Ok(DispatchOutcome::Rejected(reason))
    }
}
