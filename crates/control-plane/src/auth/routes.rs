// Account HTTP routes
// Decision: Registration is always open; AUTH_MODE only decides whether expression routes need a token

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    middleware::{AuthError, AuthState},
    password::{hash_password, verify_password},
};
use crate::storage::models::{CreateUserRow, LoginTaken};

/// Credentials for register and login
#[derive(Debug, Deserialize, ToSchema)]
pub struct Credentials {
    #[schema(example = "alice")]
    pub login: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

/// Registration acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .with_state(state)
}

/// POST /api/v1/register - Create an account
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = Credentials,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Login or password is empty", body = crate::api::ErrorResponse),
        (status = 409, description = "Login already taken", body = crate::api::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AuthState>,
    Json(req): Json<Credentials>,
) -> Result<Json<RegisterResponse>, AuthError> {
    let login = req.login.trim();
    if login.is_empty() || req.password.is_empty() {
        return Err(AuthError::bad_request("Login and password are required"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        AuthError::internal("Registration failed")
    })?;

    let user = state
        .db
        .create_user(CreateUserRow {
            login: login.to_string(),
            password_hash,
        })
        .await
        .map_err(|e| {
            if e.downcast_ref::<LoginTaken>().is_some() {
                AuthError::conflict("Login already taken")
            } else {
                tracing::error!("User creation error: {}", e);
                AuthError::internal("Registration failed")
            }
        })?;

    tracing::info!(user_id = user.id, login = %user.login, "User registered");
    Ok(Json(RegisterResponse {
        status: "ok".to_string(),
    }))
}

/// POST /api/v1/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid login or password", body = crate::api::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AuthState>,
    Json(req): Json<Credentials>,
) -> Result<Json<TokenResponse>, AuthError> {
    let user = state
        .db
        .get_user_by_login(req.login.trim())
        .await
        .map_err(|e| {
            tracing::error!("Database error during login: {}", e);
            AuthError::unauthorized("Login failed")
        })?
        .ok_or_else(|| AuthError::unauthorized("Invalid login or password"))?;

    let valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
        tracing::error!("Password verification error: {}", e);
        AuthError::unauthorized("Login failed")
    })?;
    if !valid {
        return Err(AuthError::unauthorized("Invalid login or password"));
    }

    let token = state
        .jwt_service
        .generate_token(user.id, &user.login)
        .map_err(|e| {
            tracing::error!("Token generation error: {}", e);
            AuthError::internal("Login failed")
        })?;

    tracing::debug!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}
