// Calcflow Control Plane Library
// Decision: Shared library for binaries (API server, export-openapi) and end-to-end tests

// API routes and types
pub mod api;

// Router assembly
pub mod app;

// Authentication module
pub mod auth;

// Environment configuration
pub mod config;

// User account storage
pub mod storage;

// OpenAPI spec generation
pub mod openapi;

pub use app::build_app;
pub use config::ServerConfig;
