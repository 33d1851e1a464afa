//! HTTP surface: task scheduling, status polling, and the dispatch
//! triggers.
//!
//! The dispatch endpoints return no content on success, including the
//! already-started no-op case; per-asset failures are visible only
//! through the persisted task-asset rows, which callers poll via the
//! task endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use fleetcmd_core::{AssetKey, Task, TaskId, TaskPayload};

use crate::driver::DriverError;
use crate::state::AppState;
use crate::store::StoreError;

/// Request body for the dispatch endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    /// The previously scheduled task to start.
    pub task_id: TaskId,
}

/// Request body for the schedule endpoint.
#[derive(Debug, Deserialize)]
pub struct ScheduleTaskRequest {
    /// Operation-specific payload.
    #[serde(flatten)]
    pub payload: TaskPayload,

    /// Assets the operation spans.
    pub assets: Vec<AssetKey>,
}

/// Response body for the schedule endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskResponse {
    /// Identifier of the scheduled task.
    pub task_id: TaskId,
}

/// Response for a single task.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub operation: &'static str,
    pub status: String,
    pub created_at: String,
    pub assets: Vec<TaskAssetResponse>,
}

/// Response for a single task-asset row.
#[derive(Debug, Serialize)]
pub struct TaskAssetResponse {
    pub type_id: String,
    pub asset_id: String,
    pub status: String,
    pub started_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/tasks", post(schedule_task))
        .route("/v1/tasks/:task_id", get(get_task))
        .route("/v1/tasks/download-package/dispatch", post(dispatch_download))
        .route("/v1/tasks/retrieve-log/dispatch", post(dispatch_retrieve_log))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Schedule a task: create it with one Scheduled row per asset.
async fn schedule_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScheduleTaskRequest>,
) -> Response {
    if req.assets.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: "no_assets".to_string(),
                message: "a task must address at least one asset".to_string(),
            }),
        )
            .into_response();
    }

    let mut task = Task::new(req.payload);
    for key in req.assets {
        task.add_asset(key);
    }
    let task_id = task.id.clone();

    for record in &task.assets {
        state.audit.record_create(&task_id, &record.key).await;
    }

    if let Err(e) = state.store.insert_task(task).await {
        return storage_error(&e);
    }

    info!(task_id = %task_id, "Task scheduled");
    (
        StatusCode::CREATED,
        Json(ScheduleTaskResponse { task_id }),
    )
        .into_response()
}

/// Poll one task and its task-asset rows.
async fn get_task(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Response {
    match state.store.get_task(&TaskId::new(task_id)).await {
        Ok(task) => Json(task_response(&task)).into_response(),
        Err(StoreError::TaskNotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: "task_not_found".to_string(),
                message: format!("Task not found: {}", id),
            }),
        )
            .into_response(),
        Err(e) => storage_error(&e),
    }
}

/// Trigger a download-package task.
async fn dispatch_download(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DispatchRequest>,
) -> Response {
    match state.driver.run_download_package(&req.task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => driver_error(e),
    }
}

/// Trigger a retrieve-log task.
async fn dispatch_retrieve_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DispatchRequest>,
) -> Response {
    match state.driver.run_retrieve_log(&req.task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => driver_error(e),
    }
}

fn task_response(task: &Task) -> TaskResponse {
    let operation = match &task.payload {
        TaskPayload::DownloadPackage { .. } => "download_package",
        TaskPayload::RetrieveLog { .. } => "retrieve_log",
    };
    TaskResponse {
        task_id: task.id.as_str().to_string(),
        operation,
        status: format!("{:?}", task.status),
        created_at: task.created_at.to_rfc3339(),
        assets: task
            .assets
            .iter()
            .map(|a| TaskAssetResponse {
                type_id: a.key.type_id.as_str().to_string(),
                asset_id: a.key.asset_id.as_str().to_string(),
                status: format!("{:?}", a.status),
                started_at: a.started_at.map(|t| t.to_rfc3339()),
                updated_at: a.updated_at.map(|t| t.to_rfc3339()),
            })
            .collect(),
    }
}

fn driver_error(err: DriverError) -> Response {
    let (status, code) = match &err {
        DriverError::TaskNotFound(_) => (StatusCode::NOT_FOUND, "task_not_found"),
        DriverError::WrongTaskKind { .. } => (StatusCode::CONFLICT, "wrong_task_kind"),
        DriverError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        DriverError::Availability(_) => (StatusCode::INTERNAL_SERVER_ERROR, "availability_error"),
    };
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn storage_error(err: &StoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            code: "storage_error".to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}
