// Task poller with idle backoff
// Decision: Backoff grows only while the queue is empty or unreachable; any task resets it
// Decision: Waiting is interruptible by the pool's shutdown channel

use std::sync::Arc;
use std::time::Duration;

use calcflow_core::Task;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::client::{TaskSource, WorkerError};

/// Configuration for task polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay after the first empty poll
    #[serde(with = "duration_millis")]
    pub min_interval: Duration,

    /// Upper bound for the idle delay
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,

    /// Factor applied to the delay after each consecutive empty poll
    pub backoff_multiplier: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl PollerConfig {
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }
}

/// Polls a [`TaskSource`] for one worker loop
pub struct TaskPoller {
    source: Arc<dyn TaskSource>,
    config: PollerConfig,
    current_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskPoller {
    pub fn new(
        source: Arc<dyn TaskSource>,
        config: PollerConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let current_interval = config.min_interval;
        Self {
            source,
            config,
            current_interval,
            shutdown_rx,
        }
    }

    /// Fetch one task; empty results and errors both grow the backoff
    pub async fn poll(&mut self) -> Result<Option<Task>, WorkerError> {
        match self.source.fetch_task().await {
            Ok(Some(task)) => {
                trace!(task_id = %task.id, "Fetched task");
                self.reset_backoff();
                Ok(Some(task))
            }
            Ok(None) => {
                self.increase_backoff();
                Ok(None)
            }
            Err(e) => {
                self.increase_backoff();
                Err(e)
            }
        }
    }

    /// Sleep for the current interval. Returns true if shutdown was signaled.
    pub async fn wait(&mut self) -> bool {
        if self.is_shutdown() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.current_interval) => false,
            _ = self.shutdown_rx.changed() => {
                debug!("Poller received shutdown signal");
                true
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    fn increase_backoff(&mut self) {
        let next = self
            .current_interval
            .mul_f64(self.config.backoff_multiplier.max(1.0));
        let ceiling = self.config.max_interval.max(self.config.min_interval);
        self.current_interval = next.clamp(self.config.min_interval, ceiling);
    }

    fn reset_backoff(&mut self) {
        self.current_interval = self.config.min_interval;
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ReportAck;
    use async_trait::async_trait;
    use calcflow_core::TaskResultRequest;

    struct EmptySource;

    #[async_trait]
    impl TaskSource for EmptySource {
        async fn fetch_task(&self) -> Result<Option<Task>, WorkerError> {
            Ok(None)
        }

        async fn report(&self, _report: TaskResultRequest) -> Result<ReportAck, WorkerError> {
            Ok(ReportAck::Stale)
        }
    }

    fn poller(config: PollerConfig) -> (TaskPoller, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (TaskPoller::new(Arc::new(EmptySource), config, rx), tx)
    }

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.min_interval, Duration::from_secs(1));
        assert_eq!(config.max_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_serde_uses_millis() {
        let config = PollerConfig::default().with_min_interval(Duration::from_millis(250));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["min_interval"], 250);
        let back: PollerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.min_interval, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_backoff_grows_and_clamps() {
        let config = PollerConfig::default()
            .with_min_interval(Duration::from_millis(100))
            .with_max_interval(Duration::from_millis(350))
            .with_backoff_multiplier(2.0);
        let (mut poller, _tx) = poller(config);

        assert_eq!(poller.current_interval(), Duration::from_millis(100));
        poller.poll().await.unwrap();
        assert_eq!(poller.current_interval(), Duration::from_millis(200));
        poller.poll().await.unwrap();
        assert_eq!(poller.current_interval(), Duration::from_millis(350));
        poller.poll().await.unwrap();
        assert_eq!(poller.current_interval(), Duration::from_millis(350));

        poller.reset_backoff();
        assert_eq!(poller.current_interval(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_wait_returns_on_shutdown() {
        let config = PollerConfig::default()
            .with_min_interval(Duration::from_secs(60))
            .with_max_interval(Duration::from_secs(60));
        let (mut poller, tx) = poller(config);

        let handle = tokio::spawn(async move { poller.wait().await });
        tx.send(true).unwrap();
        let shutdown = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown);
    }
}
