// Authentication extractor
// Decision: Bearer tokens in the Authorization header only
// Decision: In "none" mode, every request gets an anonymous user context

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::{config::AuthConfig, jwt::JwtService};
use crate::storage::StorageBackend;
use calcflow_core::{OwnerId, Visibility};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn conflict(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::CONFLICT,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Caller identity extracted from the request
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// `None` for anonymous callers
    pub id: Option<OwnerId>,
    pub login: String,
}

impl AuthUser {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            login: "anonymous".to_string(),
        }
    }

    /// Records this caller may read
    pub fn visibility(&self) -> Visibility {
        match self.id {
            Some(id) => Visibility::Owner(id),
            None => Visibility::All,
        }
    }
}

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub jwt_service: Arc<JwtService>,
    pub db: StorageBackend,
}

impl AuthState {
    pub fn new(config: AuthConfig, db: StorageBackend) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        Self {
            config,
            jwt_service,
            db,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        extract_auth_user(parts, &auth_state)
    }
}

fn extract_auth_user(parts: &Parts, auth_state: &AuthState) -> Result<AuthUser, AuthError> {
    if !auth_state.config.is_enabled() {
        return Ok(AuthUser::anonymous());
    }

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::unauthorized("Invalid authorization header"))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::unauthorized("Expected a Bearer token"))?;

    let claims = auth_state
        .jwt_service
        .validate_token(token.trim())
        .map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            AuthError::unauthorized("Invalid or expired token")
        })?;
    let id = claims
        .user_id()
        .map_err(|_| AuthError::unauthorized("Invalid user ID in token"))?;

    Ok(AuthUser {
        id: Some(id),
        login: claims.login,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthMode;
    use axum::http::Request;

    fn state(mode: AuthMode) -> AuthState {
        AuthState::new(
            AuthConfig::with_secret(mode, "middleware-test-secret"),
            StorageBackend::in_memory(),
        )
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/expressions");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_none_mode_is_anonymous() {
        let user = extract_auth_user(&parts(None), &state(AuthMode::None)).unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.login, "anonymous");
        assert_eq!(user.visibility(), Visibility::All);
    }

    #[test]
    fn test_full_mode_requires_token() {
        let err = extract_auth_user(&parts(None), &state(AuthMode::Full)).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err =
            extract_auth_user(&parts(Some("Basic abc")), &state(AuthMode::Full)).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = extract_auth_user(&parts(Some("Bearer nope")), &state(AuthMode::Full))
            .unwrap_err();
        assert_eq!(err.error, "Invalid or expired token");
    }

    #[test]
    fn test_full_mode_accepts_valid_token() {
        let state = state(AuthMode::Full);
        let token = state.jwt_service.generate_token(7, "alice").unwrap();
        let header = format!("Bearer {}", token);

        let user = extract_auth_user(&parts(Some(&header)), &state).unwrap();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.login, "alice");
        assert_eq!(user.visibility(), Visibility::Owner(7));
    }
}
