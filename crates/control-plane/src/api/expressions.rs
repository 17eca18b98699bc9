// Expression HTTP routes: submit, list, get

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use calcflow_core::{ExpressionRecord, Orchestrator};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{ApiError, ErrorResponse};
use crate::auth::{AuthState, AuthUser};

/// Request to evaluate an expression
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculateRequest {
    /// Arithmetic over integers with `+ - * /`, spaces and parentheses.
    #[schema(example = "2 + 2 * 2")]
    pub expression: String,
}

/// ID of the accepted expression
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculateResponse {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpressionListResponse {
    pub expressions: Vec<ExpressionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpressionResponse {
    pub expression: ExpressionRecord,
}

/// App state for expression routes
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, auth: AuthState) -> Self {
        Self { orchestrator, auth }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/calculate", post(calculate))
        .route("/api/v1/expressions", get(list_expressions))
        .route("/api/v1/expressions/:id", get(get_expression))
        .with_state(state)
}

/// POST /api/v1/calculate - Submit an expression for evaluation
#[utoipa::path(
    post,
    path = "/api/v1/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 201, description = "Expression accepted", body = CalculateResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "Invalid expression", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expressions"
)]
pub async fn calculate(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    let Json(req) = payload?;
    let id = state.orchestrator.submit(user.id, &req.expression)?;
    Ok((StatusCode::CREATED, Json(CalculateResponse { id })))
}

/// GET /api/v1/expressions - List expressions visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/expressions",
    responses(
        (status = 200, description = "Expressions, oldest first", body = ExpressionListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expressions"
)]
pub async fn list_expressions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<ExpressionListResponse> {
    Json(ExpressionListResponse {
        expressions: state.orchestrator.list(user.visibility()),
    })
}

/// GET /api/v1/expressions/{id} - Get one expression
#[utoipa::path(
    get,
    path = "/api/v1/expressions/{id}",
    params(
        ("id" = Uuid, Path, description = "Expression ID")
    ),
    responses(
        (status = 200, description = "Expression found", body = ExpressionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Expression not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expressions"
)]
pub async fn get_expression(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::not_found(format!("expression not found: {}", id)))?;
    let expression = state.orchestrator.get(id, user.visibility())?;
    Ok(Json(ExpressionResponse { expression }))
}
