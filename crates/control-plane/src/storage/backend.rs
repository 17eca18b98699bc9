// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// User accounts live either in SQLite (DB_PATH) or in memory (DB_PATH=":memory:").

use anyhow::Result;
use std::sync::Arc;

use super::memory::InMemoryDatabase;
use super::models::{CreateUserRow, UserRow};
use super::repositories::Database;
use crate::config::IN_MEMORY_DB_PATH;

/// Storage backend that can be either SQLite or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    Sqlite(Database),
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Open the backend selected by `db_path`
    pub async fn open(db_path: &str) -> Result<Self> {
        if db_path == IN_MEMORY_DB_PATH {
            Ok(Self::in_memory())
        } else {
            Ok(Self::Sqlite(Database::from_path(db_path).await?))
        }
    }

    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, input: CreateUserRow) -> Result<UserRow> {
        match self {
            Self::Sqlite(db) => db.create_user(input).await,
            Self::InMemory(db) => db.create_user(input).await,
        }
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        match self {
            Self::Sqlite(db) => db.get_user_by_login(login).await,
            Self::InMemory(db) => db.get_user_by_login(login).await,
        }
    }
}
