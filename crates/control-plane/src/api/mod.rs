// HTTP API routes
//
// Each submodule owns its routes and its own AppState.

pub mod common;
pub mod expressions;
pub mod internal;

// Re-export common types
pub use common::{ApiError, ErrorResponse};
