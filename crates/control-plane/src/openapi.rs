// OpenAPI specification generation
//
// Used by the API server (Swagger UI) and the export-openapi binary.

use crate::api;
use crate::auth;
use calcflow_core::{ExpressionRecord, ExpressionStatus, Task, TaskResultRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation for the Calcflow API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::expressions::calculate,
        api::expressions::list_expressions,
        api::expressions::get_expression,
        api::internal::next_task,
        api::internal::report_result,
        auth::routes::register,
        auth::routes::login,
    ),
    components(
        schemas(
            ExpressionRecord, ExpressionStatus, Task, TaskResultRequest,
            api::ErrorResponse,
            api::expressions::CalculateRequest, api::expressions::CalculateResponse,
            api::expressions::ExpressionListResponse, api::expressions::ExpressionResponse,
            auth::routes::Credentials, auth::routes::RegisterResponse, auth::routes::TokenResponse,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "expressions", description = "Expression submission and lookup"),
        (name = "auth", description = "Account registration and login"),
        (name = "internal", description = "Worker task protocol")
    ),
    info(
        title = "Calcflow API",
        version = "0.1.0",
        description = "Distributed arithmetic expression evaluation",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> serde_json::Result<String> {
        Self::openapi().to_pretty_json()
    }
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_all_routes() {
        let json: serde_json::Value = serde_json::from_str(&ApiDoc::to_json().unwrap()).unwrap();
        let paths = json["paths"].as_object().unwrap();
        for path in [
            "/api/v1/calculate",
            "/api/v1/expressions",
            "/api/v1/expressions/{id}",
            "/api/v1/register",
            "/api/v1/login",
            "/internal/task",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(json["components"]["securitySchemes"]["bearer"].is_object());
    }
}
