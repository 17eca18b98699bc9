// Storage layer for user accounts
// Decision: Support both SQLite (default) and in-memory (dev mode, tests)
// Decision: Expression state is not persisted; it lives in calcflow-core's store

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::Database;
