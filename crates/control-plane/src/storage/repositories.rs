// SQLite-backed user repository
// Decision: Schema is created on connect (single table, no migration tooling)
// Decision: Login uniqueness is enforced by the UNIQUE constraint, not a pre-check

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::models::{CreateUserRow, LoginTaken, UserRow};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite file at `path` and ensure the schema
    pub async fn from_path(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database at {}", path))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create users table")?;
        Ok(())
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, input: CreateUserRow) -> Result<UserRow> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (login, password_hash, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, login, password_hash, created_at
            "#,
        )
        .bind(&input.login)
        .bind(&input.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LoginTaken(input.login).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, login, password_hash, created_at FROM users WHERE login = ?1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDb {
        path: std::path::PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("calcflow-{}.db", uuid::Uuid::now_v7()));
            Self { path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let tmp = TempDb::new();
        let db = Database::from_path(tmp.path.to_str().unwrap()).await.unwrap();

        let user = db
            .create_user(CreateUserRow {
                login: "alice".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        assert!(user.id > 0);
        assert_eq!(user.login, "alice");

        let found = db.get_user_by_login("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.get_user_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_login_is_login_taken() {
        let tmp = TempDb::new();
        let db = Database::from_path(tmp.path.to_str().unwrap()).await.unwrap();
        let input = CreateUserRow {
            login: "alice".to_string(),
            password_hash: "hash".to_string(),
        };

        db.create_user(input.clone()).await.unwrap();
        let err = db.create_user(input).await.unwrap_err();
        assert!(err.downcast_ref::<LoginTaken>().is_some());
    }

    #[tokio::test]
    async fn test_schema_survives_reopen() {
        let tmp = TempDb::new();
        let path = tmp.path.to_str().unwrap().to_string();
        {
            let db = Database::from_path(&path).await.unwrap();
            db.create_user(CreateUserRow {
                login: "carol".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
            db.pool.close().await;
        }

        let db = Database::from_path(&path).await.unwrap();
        assert!(db.get_user_by_login("carol").await.unwrap().is_some());
    }
}
