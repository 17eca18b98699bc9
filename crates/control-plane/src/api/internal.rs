// Internal worker protocol routes
// Decision: Workers are trusted; these routes skip authentication
// Decision: 204 (no body) when the queue is empty

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use calcflow_core::{Orchestrator, Task, TaskResultRequest};

use super::common::{ApiError, ErrorResponse};

/// App state for internal routes
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/internal/task", get(next_task).post(report_result))
        .with_state(state)
}

/// GET /internal/task - Lease the next task
#[utoipa::path(
    get,
    path = "/internal/task",
    responses(
        (status = 200, description = "Task leased to the caller", body = Task),
        (status = 204, description = "No task available")
    ),
    tag = "internal"
)]
pub async fn next_task(State(state): State<AppState>) -> Response {
    match state.orchestrator.next_task() {
        Some(task) => Json(task).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /internal/task - Report a task outcome
#[utoipa::path(
    post,
    path = "/internal/task",
    request_body = TaskResultRequest,
    responses(
        (status = 200, description = "Result recorded"),
        (status = 404, description = "Unknown or stale task", body = ErrorResponse),
        (status = 422, description = "Malformed report", body = ErrorResponse)
    ),
    tag = "internal"
)]
pub async fn report_result(
    State(state): State<AppState>,
    payload: Result<Json<TaskResultRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(report) = payload?;
    let task_id = report.id;
    let outcome = report
        .outcome()
        .ok_or_else(|| ApiError::unprocessable("exactly one of `result` or `error` is required"))?;

    state.orchestrator.report(task_id, outcome).map_err(|e| {
        tracing::debug!(task_id = %task_id, error = %e, "Report rejected");
        ApiError::from(e)
    })?;
    Ok(StatusCode::OK)
}
