// Logging setup shared by the control plane and worker binaries
//
// Structured logs via tracing-subscriber's fmt layer. The filter comes from
// RUST_LOG, then LOG_LEVEL, then defaults to "info".

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, attached to the startup log line
    pub service_name: String,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Log filter (e.g., "info", "debug", "calcflow_core=debug")
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "calcflow".to_string(),
            enable_console: true,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SERVICE_NAME`: Service name (default: `default_service`)
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env(default_service: &str) -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| default_service.to_string()),
            enable_console: true,
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
        }
    }

    fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Install the global tracing subscriber
///
/// Must be called once, early in `main`.
pub fn init_telemetry(config: TelemetryConfig) {
    let console_layer = if config.enable_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(config.filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry().with(console_layer).init();

    tracing::debug!(service = %config.service_name, "Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "calcflow");
        assert!(config.enable_console);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_invalid_filter_falls_back_to_info() {
        let config = TelemetryConfig {
            log_filter: Some("[[not a filter".to_string()),
            ..TelemetryConfig::default()
        };
        assert_eq!(config.filter().to_string(), "info");
    }
}
