//! Worker execution endpoint
//!
//! HTTP server accepting start requests from the coordinator. The
//! accept call validates the referenced state, hands execution off to a
//! tokio task and returns immediately; completion is signaled only
//! through the shared store, never through this response.

pub mod registry;
mod runner;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch::START_WORKER_PATH;
use crate::error::Result;
use crate::store::{ExecutionId, ExecutionStore, RunId};

pub use registry::{UnitRegistry, WorkUnit};

/// Shared state behind the worker endpoints
pub struct WorkerState {
    store: Arc<dyn ExecutionStore>,
    registry: UnitRegistry,
}

impl WorkerState {
    pub fn new(store: Arc<dyn ExecutionStore>, registry: UnitRegistry) -> Self {
        Self { store, registry }
    }
}

/// Worker HTTP server
pub struct WorkerServer {
    state: Arc<WorkerState>,
    port: u16,
}

impl WorkerServer {
    pub fn new(state: Arc<WorkerState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let app = build_router(self.state);

        info!("Worker endpoint listening on {addr}");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the worker router; exposed for tests driving a real listener
pub fn build_router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route(START_WORKER_PATH, post(start_worker))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start request parameters, mirroring what the dispatcher sends
#[derive(Debug, Deserialize)]
struct StartWorkerParams {
    run_id: RunId,
    execution_id: ExecutionId,
    unit: String,
}

/// Acknowledgement payload for an accepted start request
#[derive(Debug, Serialize)]
struct StartAck {
    execution_id: ExecutionId,
}

/// API response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiRejection = (StatusCode, Json<ApiResponse<StartAck>>);

fn rejection(status: StatusCode, message: String) -> ApiRejection {
    (status, Json(ApiResponse::error(message)))
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

/// Accept a start request for one partition.
///
/// Unknown execution records and unknown unit names are rejected
/// synchronously with the store left untouched; those are protocol
/// violations the dispatcher cannot see once the send succeeded.
async fn start_worker(
    State(state): State<Arc<WorkerState>>,
    Query(params): Query<StartWorkerParams>,
) -> std::result::Result<Json<ApiResponse<StartAck>>, ApiRejection> {
    info!(
        run_id = %params.run_id,
        execution_id = %params.execution_id,
        unit = %params.unit,
        "start request received"
    );

    let record = state
        .store
        .get(params.execution_id)
        .await
        .map_err(|e| rejection(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let record = match record {
        Some(record) if record.run_id == params.run_id => record,
        _ => {
            return Err(rejection(
                StatusCode::NOT_FOUND,
                format!(
                    "no execution record {} for run {}",
                    params.execution_id, params.run_id
                ),
            ))
        }
    };

    let Some(unit) = state.registry.resolve(&params.unit) else {
        return Err(rejection(
            StatusCode::BAD_REQUEST,
            format!("unknown work unit '{}'", params.unit),
        ));
    };

    // Non-blocking hand-off: the response returns before the work runs
    let execution_id = record.id;
    tokio::spawn(runner::execute_partition(state.store.clone(), unit, record));

    Ok(Json(ApiResponse::success(StartAck { execution_id })))
}
