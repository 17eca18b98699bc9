// Worker configuration from environment variables
// Decision: Invalid or missing values fall back to defaults with a warning

use std::time::Duration;

use tracing::warn;

use crate::poller::PollerConfig;
use crate::pool::WorkerPoolConfig;

pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the control plane
    pub orchestrator_url: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    pub pool: WorkerPoolConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            request_timeout: Duration::from_secs(5),
            pool: WorkerPoolConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Read configuration from the process environment
    ///
    /// - `ORCHESTRATOR_URL`: control plane base URL
    /// - `COMPUTING_POWER`: number of concurrent worker loops
    /// - `POLL_INTERVAL_MS`: idle delay after an empty poll
    /// - `MAX_POLL_INTERVAL_MS`: backoff ceiling
    /// - `REQUEST_TIMEOUT_MS`: HTTP timeout
    /// - `SHUTDOWN_TIMEOUT_SECS`: grace period for in-flight tasks
    /// - `WORKER_ID`: identifier used in logs
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let orchestrator_url = get("ORCHESTRATOR_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.orchestrator_url);

        let computing_power = parse_positive(&get, "COMPUTING_POWER")
            .map(|n| n as usize)
            .unwrap_or(defaults.pool.computing_power);

        let min_interval = parse_positive(&get, "POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.pool.poller.min_interval);
        let max_interval = parse_positive(&get, "MAX_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.pool.poller.max_interval)
            .max(min_interval);

        let request_timeout = parse_positive(&get, "REQUEST_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        let shutdown_timeout = parse_positive(&get, "SHUTDOWN_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.pool.shutdown_timeout);

        let worker_id = get("WORKER_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.pool.worker_id);

        Self {
            orchestrator_url,
            request_timeout,
            pool: WorkerPoolConfig::default()
                .with_worker_id(worker_id)
                .with_computing_power(computing_power)
                .with_poller(
                    PollerConfig::default()
                        .with_min_interval(min_interval)
                        .with_max_interval(max_interval),
                )
                .with_shutdown_timeout(shutdown_timeout),
        }
    }
}

fn parse_positive(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = get(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(key, value = %raw, "Ignoring invalid value, expected a positive integer");
            None
        }
    }
}
