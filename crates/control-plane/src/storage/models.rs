// Database row types

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUserRow {
    pub login: String,
    pub password_hash: String,
}

/// Returned (inside `anyhow::Error`) when a login is already registered
#[derive(Debug, Error)]
#[error("login already taken: {0}")]
pub struct LoginTaken(pub String);
