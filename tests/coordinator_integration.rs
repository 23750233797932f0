//! End-to-end tests of the dispatch / execute / poll protocol
//!
//! Each test drives a real worker listener; coordinator and workers
//! share one in-memory store, standing in for the shared database.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use gridrun::config::{RunConfig, StoreBackend, StoreConfig};
use gridrun::coordinator::Coordinator;
use gridrun::dispatch::DispatchOutcome;
use gridrun::partition::PartitionDescriptor;
use gridrun::poller::PollOutcome;
use gridrun::store::memory::MemoryStore;
use gridrun::store::{ExecutionRecord, ExecutionStatus, ExecutionStore, RunId};
use gridrun::worker::{build_router, UnitRegistry, WorkUnit, WorkerState};

/// Records which partitions it was asked to run
#[derive(Default)]
struct RecordingUnit {
    seen: Mutex<Vec<PartitionDescriptor>>,
}

#[async_trait]
impl WorkUnit for RecordingUnit {
    async fn execute(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        self.seen.lock().await.push(record.partition);
        Ok(())
    }
}

/// Never finishes within any test deadline
struct StallingUnit;

#[async_trait]
impl WorkUnit for StallingUnit {
    async fn execute(&self, _record: &ExecutionRecord) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

async fn spawn_worker(store: Arc<MemoryStore>, registry: UnitRegistry) -> String {
    let state = Arc::new(WorkerState::new(store, registry));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn run_config(workers: Vec<String>, deadline: Duration) -> RunConfig {
    RunConfig {
        unit: "recorder".to_string(),
        workers,
        poll_interval: Duration::from_millis(50),
        deadline,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn full_run_completes_every_partition() {
    let store = Arc::new(MemoryStore::new());
    let unit = Arc::new(RecordingUnit::default());

    let mut workers = Vec::new();
    for _ in 0..2 {
        let mut registry = UnitRegistry::new();
        registry.register("recorder", unit.clone());
        workers.push(spawn_worker(store.clone(), registry).await);
    }

    let config = run_config(workers, Duration::from_secs(5));
    let coordinator = Coordinator::new(store.clone(), &config).unwrap();
    let report = coordinator.run("recorder").await.unwrap();

    assert!(report.succeeded());
    assert!(report
        .dispatch
        .iter()
        .all(|d| *d == DispatchOutcome::Accepted));
    assert!(report
        .records
        .iter()
        .all(|r| r.status == ExecutionStatus::Completed));

    let mut seen: Vec<u32> = unit.seen.lock().await.iter().map(|p| p.index).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1]);
    assert!(unit.seen.lock().await.iter().all(|p| p.count == 2));
}

#[tokio::test]
async fn rejected_dispatch_is_failed_before_polling_starts() {
    let store = Arc::new(MemoryStore::new());
    let unit = Arc::new(RecordingUnit::default());

    let mut registry = UnitRegistry::new();
    registry.register("recorder", unit.clone());
    let good = spawn_worker(store.clone(), registry).await;
    // Nothing listens on port 9; that partition's dispatch is refused
    let dead = "http://127.0.0.1:9".to_string();

    let config = run_config(vec![good, dead], Duration::from_secs(5));
    let coordinator = Coordinator::new(store.clone(), &config).unwrap();
    let report = coordinator.run("recorder").await.unwrap();

    assert!(!report.succeeded());
    assert!(matches!(report.outcome, PollOutcome::Completed { .. }));
    assert_eq!(report.dispatch[0], DispatchOutcome::Accepted);
    assert!(matches!(report.dispatch[1], DispatchOutcome::Rejected(_)));

    assert_eq!(report.records[0].status, ExecutionStatus::Completed);
    assert_eq!(report.records[1].status, ExecutionStatus::Failed);
    assert!(report.records[1]
        .failure_detail
        .as_deref()
        .unwrap()
        .contains("start request"));

    // Only the dispatched partition ever ran
    assert_eq!(unit.seen.lock().await.len(), 1);
}

#[tokio::test]
async fn stalled_worker_times_out_without_cancellation() {
    let store = Arc::new(MemoryStore::new());

    let mut registry = UnitRegistry::new();
    registry.register("recorder", Arc::new(StallingUnit));
    let worker = spawn_worker(store.clone(), registry).await;

    let config = run_config(vec![worker], Duration::from_millis(400));
    let coordinator = Coordinator::new(store.clone(), &config).unwrap();
    let report = coordinator.run("recorder").await.unwrap();

    assert!(!report.succeeded());
    let PollOutcome::TimedOutWithOrphans { orphans, statuses } = &report.outcome else {
        panic!("expected timeout, got {:?}", report.outcome);
    };
    assert_eq!(orphans.len(), 1);
    // The worker accepted and went running; no stop was ever issued, so
    // the record stays running past the coordinator's deadline
    assert_eq!(statuses[&orphans[0]], ExecutionStatus::Running);
    let record = store.get(orphans[0]).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Running);
}

#[tokio::test]
async fn unknown_execution_record_is_rejected_and_store_untouched() {
    let store = Arc::new(MemoryStore::new());
    let worker = spawn_worker(store.clone(), UnitRegistry::new()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{worker}/start-worker"))
        .query(&[
            ("run_id", RunId::new().to_string()),
            ("execution_id", gridrun::store::ExecutionId::new().to_string()),
            ("unit", "recorder".to_string()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_unit_is_rejected_without_mutating_the_record() {
    let store = Arc::new(MemoryStore::new());
    let worker = spawn_worker(store.clone(), UnitRegistry::new()).await;

    let record = ExecutionRecord::new(
        RunId::new(),
        "missing-unit",
        PartitionDescriptor { index: 0, count: 1 },
    );
    store.create(&record).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{worker}/start-worker"))
        .query(&[
            ("run_id", record.run_id.to_string()),
            ("execution_id", record.id.to_string()),
            ("unit", "missing-unit".to_string()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let stored = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Pending);
}

#[tokio::test]
async fn mismatched_run_id_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut registry = UnitRegistry::new();
    registry.register("recorder", Arc::new(RecordingUnit::default()));
    let worker = spawn_worker(store.clone(), registry).await;

    let record = ExecutionRecord::new(
        RunId::new(),
        "recorder",
        PartitionDescriptor { index: 0, count: 1 },
    );
    store.create(&record).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{worker}/start-worker"))
        .query(&[
            ("run_id", RunId::new().to_string()),
            ("execution_id", record.id.to_string()),
            ("unit", "recorder".to_string()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let stored = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Pending);
}
