// Router assembly
// Decision: Public routes honour API_PREFIX; /health and /internal/* never do
// Decision: Shared by main.rs and the end-to-end tests
// Decision: A panicking handler yields a generic 500; the panic text is only logged

use std::any::Any;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::get, Json, Router};
use calcflow_core::Orchestrator;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{self, ErrorResponse};
use crate::auth::{self, AuthState};
use crate::config::ServerConfig;
use crate::openapi::ApiDoc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub auth_mode: String,
}

#[derive(Clone)]
struct HealthState {
    auth_mode: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_mode: state.auth_mode.to_string(),
    })
}

/// Build the complete HTTP application
pub fn build_app(config: &ServerConfig, orchestrator: Orchestrator, auth_state: AuthState) -> Router {
    let health_state = HealthState {
        auth_mode: auth_state.config.mode.as_str(),
    };

    let api_routes = Router::new()
        .merge(api::expressions::routes(api::expressions::AppState::new(
            orchestrator.clone(),
            auth_state.clone(),
        )))
        .merge(auth::routes(auth_state));

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(build_router_with_prefix(api_routes, &config.api_prefix))
        .merge(api::internal::routes(api::internal::AppState::new(
            orchestrator,
        )))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = match cors_layer(&config.cors_allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    recover_panics(app).layer(TraceLayer::new_for_http())
}

fn recover_panics(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("internal server error")),
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]),
    )
}

/// Build router with optional API prefix
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
