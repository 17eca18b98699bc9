// In-memory user storage for dev mode and tests
// Decision: Use parking_lot for thread-safe access
// Decision: IDs are a monotonically increasing i64, like SQLite's AUTOINCREMENT

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::models::{CreateUserRow, LoginTaken, UserRow};

#[derive(Default)]
struct Users {
    by_id: HashMap<i64, UserRow>,
    next_id: i64,
}

/// In-memory database; everything is lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<Users>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_user(&self, input: CreateUserRow) -> Result<UserRow> {
        let mut users = self.users.write();
        if users.by_id.values().any(|u| u.login == input.login) {
            return Err(LoginTaken(input.login).into());
        }

        users.next_id += 1;
        let row = UserRow {
            id: users.next_id,
            login: input.login,
            password_hash: input.password_hash,
            created_at: Utc::now(),
        };
        users.by_id.insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        Ok(self
            .users
            .read()
            .by_id
            .values()
            .find(|u| u.login == login)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(login: &str) -> CreateUserRow {
        CreateUserRow {
            login: login.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let db = InMemoryDatabase::new();
        let a = db.create_user(new_user("a")).await.unwrap();
        let b = db.create_user(new_user("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(db.get_user_by_login("b").await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_duplicate_login() {
        let db = InMemoryDatabase::new();
        db.create_user(new_user("a")).await.unwrap();
        let err = db.create_user(new_user("a")).await.unwrap_err();
        assert!(err.downcast_ref::<LoginTaken>().is_some());
        assert!(db.get_user_by_login("a").await.unwrap().is_some());
        assert!(db.get_user_by_login("z").await.unwrap().is_none());
    }
}
