//! HTTP adapter over the task service.
//!
//! # Responsibility
//! - Expose list/create/update/delete and a health probe under `/api`.
//! - Check request shape before anything reaches the service.
//! - Map service errors to status codes without leaking storage details.
//!
//! # Invariants
//! - Error bodies are always `{"message": "..."}`.
//! - A storage failure fails only the request that hit it.
//! - Store calls run on the blocking pool, never on a runtime worker.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use daylist_core::{
    core_version, NewTask, RepoError, RepoResult, Task, TaskId, TaskKind, TaskListQuery,
    TaskService,
};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

const MSG_TASK_NOT_FOUND: &str = "Task not found";
const MSG_INVALID_COMPLETED: &str = "Invalid completed status";
const MSG_INVALID_PAYLOAD: &str = "Invalid task payload";
const MSG_INVALID_KIND: &str = "Invalid task kind; expected fixed or variable";

#[derive(Clone)]
struct ApiState {
    service: TaskService,
}

/// Builds the `/api` router over `service`.
pub fn router(service: TaskService) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", patch(update_task).delete(delete_task))
        .layer(middleware::from_fn(log_request))
        .with_state(ApiState { service })
}

/// Error response carrying a status code and a caller-safe message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, MSG_TASK_NOT_FOUND)
    }

    /// Maps a repository error; `storage_message` is used for any storage
    /// failure so no backend detail reaches the caller.
    fn from_repo(err: RepoError, storage_message: &'static str) -> Self {
        match err {
            RepoError::Validation(validation) => Self::bad_request(validation.to_string()),
            RepoError::NotFound(_) => Self::not_found(),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, storage_message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Runs a synchronous service call on the blocking pool.
///
/// `storage_message` is reported for storage failures and for a call that
/// panicked or was cancelled.
async fn with_service<T, F>(
    state: &ApiState,
    storage_message: &'static str,
    op: F,
) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&TaskService) -> RepoResult<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|err| {
            warn!("event=http_blocking module=api status=error error={err}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, storage_message)
        })?
        .map_err(|err| ApiError::from_repo(err, storage_message))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    kind: Option<String>,
}

/// Create body. Missing `completed`/`isFixed` default to false; a missing
/// or null title is treated as empty so it fails the title rule.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    is_fixed: bool,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": core_version(),
    }))
}

async fn list_tasks(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let kind = params
        .kind
        .map(|raw| TaskKind::parse(&raw).ok_or_else(|| ApiError::bad_request(MSG_INVALID_KIND)))
        .transpose()?;
    let query = TaskListQuery { kind };

    with_service(&state, "Failed to list tasks", move |service| {
        service.list_tasks(&query)
    })
    .await
    .map(Json)
}

async fn create_task(
    State(state): State<ApiState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(
            "event=http_reject module=api status=rejected route=create_task reason={}",
            rejection.body_text()
        );
        ApiError::bad_request(MSG_INVALID_PAYLOAD)
    })?;

    let new_task = NewTask::new(request.title.unwrap_or_default())
        .completed(request.completed)
        .fixed(request.is_fixed);
    let created = with_service(&state, "Failed to create task", move |service| {
        service.create_task(&new_task)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let completed = payload
        .ok()
        .and_then(|Json(body)| body.get("completed").and_then(Value::as_bool))
        .ok_or_else(|| ApiError::bad_request(MSG_INVALID_COMPLETED))?;
    let id = parse_task_id(&raw_id)?;

    with_service(&state, "Failed to update task", move |service| {
        service.set_completed(id, completed)
    })
    .await
    .map(Json)
}

async fn delete_task(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_task_id(&raw_id)?;
    let deleted = with_service(&state, "Failed to delete task", move |service| {
        service.delete_task(id)
    })
    .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

/// Ids that are not integers can never resolve, so they are reported as
/// not found rather than as malformed requests.
fn parse_task_id(raw: &str) -> ApiResult<TaskId> {
    raw.trim().parse::<TaskId>().map_err(|_| ApiError::not_found())
}

async fn log_request(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = started_at.elapsed().as_millis();
    if status.is_server_error() {
        warn!(
            "event=http_request module=api status=error method={method} path={path} code={} duration_ms={duration_ms}",
            status.as_u16()
        );
    } else {
        debug!(
            "event=http_request module=api status=ok method={method} path={path} code={} duration_ms={duration_ms}",
            status.as_u16()
        );
    }
    response
}
