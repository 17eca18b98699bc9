// Server configuration loaded from environment variables
// Decision: Same variable names as the worker-facing docs (SERVER_PORT, DB_PATH)
// Decision: Lease timings are whole seconds

use std::time::Duration;

use calcflow_core::{TaskQueueConfig, DEFAULT_LEASE_DURATION, DEFAULT_SWEEP_INTERVAL};

/// Path that selects the in-memory user backend
pub const IN_MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,
    /// SQLite file for user accounts, or `:memory:`
    pub db_path: String,
    /// Time a worker has to report a leased task
    pub lease_duration: Duration,
    /// Period of the background lease sweeper
    pub lease_sweep_interval: Duration,
    /// Optional prefix for every API route (e.g. "/calc")
    pub api_prefix: String,
    /// Origins allowed by CORS; empty means same-origin only
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: "calc.db".to_string(),
            lease_duration: DEFAULT_LEASE_DURATION,
            lease_sweep_interval: DEFAULT_SWEEP_INTERVAL,
            api_prefix: String::new(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let db_path = std::env::var("DB_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.db_path);

        let lease_duration = std::env::var("LEASE_DURATION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.lease_duration);

        let lease_sweep_interval = std::env::var("LEASE_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.lease_sweep_interval);

        let api_prefix = std::env::var("API_PREFIX").unwrap_or_default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        Self {
            port,
            db_path,
            lease_duration,
            lease_sweep_interval,
            api_prefix,
            cors_allowed_origins,
        }
    }

    pub fn queue_config(&self) -> TaskQueueConfig {
        TaskQueueConfig::default().with_lease_duration(self.lease_duration)
    }

    pub fn uses_in_memory_db(&self) -> bool {
        self.db_path == IN_MEMORY_DB_PATH
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
