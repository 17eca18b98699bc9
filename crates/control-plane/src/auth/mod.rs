// Authentication: accounts, JWT issuance and the AuthUser extractor

pub mod config;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod routes;

pub use config::{AuthConfig, AuthMode, JwtConfig};
pub use middleware::{AuthError, AuthState, AuthUser};
pub use routes::routes;
