// Worker pool: N independent poll-evaluate-report loops
// Decision: Loops share nothing but the task source, the evaluator and the shutdown channel
// Decision: Transport failures never stop a loop; the poller backs off and retries

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calcflow_core::{Evaluator, Task, TaskOutcome, TaskResultRequest};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::{ReportAck, TaskSource};
use crate::poller::{PollerConfig, TaskPoller};

/// Configuration for a worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Identifier used in logs
    pub worker_id: String,

    /// Number of concurrent worker loops
    pub computing_power: usize,

    /// Polling behaviour shared by all loops
    pub poller: PollerConfig,

    /// How long shutdown waits for loops to finish their current task
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::now_v7()),
            computing_power: 4,
            poller: PollerConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_computing_power(mut self, n: usize) -> Self {
        self.computing_power = n;
        self
    }

    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

#[derive(Debug, Error)]
pub enum WorkerPoolError {
    #[error("worker pool already started")]
    AlreadyStarted,

    #[error("computing power must be at least 1")]
    NoCapacity,

    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Counters across all loops of a pool
#[derive(Debug, Default)]
pub struct PoolStats {
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    transport_errors: AtomicU64,
}

/// Point-in-time copy of [`PoolStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Successful evaluations accepted by the control plane
    pub completed: u64,
    /// Failed evaluations accepted by the control plane
    pub failed: u64,
    /// Results rejected because the lease was gone
    pub discarded: u64,
    pub transport_errors: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Runs `computing_power` worker loops against a [`TaskSource`]
pub struct WorkerPool {
    config: WorkerPoolConfig,
    source: Arc<dyn TaskSource>,
    evaluator: Arc<dyn Evaluator>,
    stats: Arc<PoolStats>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        config: WorkerPoolConfig,
        source: Arc<dyn TaskSource>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            source,
            evaluator,
            stats: Arc::new(PoolStats::default()),
            shutdown_tx,
            shutdown_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Spawn the worker loops
    #[instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub fn start(&self) -> Result<(), WorkerPoolError> {
        if self.config.computing_power == 0 {
            return Err(WorkerPoolError::NoCapacity);
        }

        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            return Err(WorkerPoolError::AlreadyStarted);
        }

        info!(
            worker_id = %self.config.worker_id,
            computing_power = self.config.computing_power,
            min_interval_ms = self.config.poller.min_interval.as_millis() as u64,
            max_interval_ms = self.config.poller.max_interval.as_millis() as u64,
            "Starting worker pool"
        );

        for slot in 0..self.config.computing_power {
            let poller = TaskPoller::new(
                Arc::clone(&self.source),
                self.config.poller.clone(),
                self.shutdown_rx.clone(),
            );
            let worker = WorkerLoop {
                slot,
                worker_id: self.config.worker_id.clone(),
                poller,
                source: Arc::clone(&self.source),
                evaluator: Arc::clone(&self.evaluator),
                stats: Arc::clone(&self.stats),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        Ok(())
    }

    /// Signal all loops to stop and wait for them
    #[instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub async fn shutdown(&self) -> Result<(), WorkerPoolError> {
        info!("Shutting down worker pool");
        let _ = self.shutdown_tx.send(true);

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        let join_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Worker loop panicked");
                }
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, join_all).await {
            Ok(()) => {
                let stats = self.stats();
                info!(
                    completed = stats.completed,
                    failed = stats.failed,
                    discarded = stats.discarded,
                    "Worker pool stopped"
                );
                Ok(())
            }
            Err(_) => Err(WorkerPoolError::ShutdownTimeout(self.config.shutdown_timeout)),
        }
    }
}

struct WorkerLoop {
    slot: usize,
    worker_id: String,
    poller: TaskPoller,
    source: Arc<dyn TaskSource>,
    evaluator: Arc<dyn Evaluator>,
    stats: Arc<PoolStats>,
}

impl WorkerLoop {
    async fn run(mut self) {
        debug!(worker_id = %self.worker_id, slot = self.slot, "Worker loop started");

        loop {
            if self.poller.is_shutdown() {
                break;
            }

            match self.poller.poll().await {
                Ok(Some(task)) => {
                    self.execute(task).await;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.transport_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(slot = self.slot, error = %e, "Failed to fetch task");
                }
            }

            if self.poller.wait().await {
                break;
            }
        }

        debug!(worker_id = %self.worker_id, slot = self.slot, "Worker loop stopped");
    }

    async fn execute(&self, task: Task) {
        let outcome = match self.evaluator.evaluate(&task.expression) {
            Ok(value) => TaskOutcome::Success(value),
            Err(e) => {
                if e.is_syntax() {
                    // Submissions are parsed before queueing, so this points at a mismatched evaluator
                    warn!(task_id = %task.id, error = %e, "Task expression failed to parse");
                }
                TaskOutcome::Failure(e.to_string())
            }
        };
        let succeeded = matches!(outcome, TaskOutcome::Success(_));

        debug!(
            slot = self.slot,
            task_id = %task.id,
            expression_id = %task.expression_id,
            attempt = task.attempt,
            succeeded,
            "Evaluated task"
        );

        match self
            .source
            .report(TaskResultRequest::new(task.id, outcome))
            .await
        {
            Ok(ReportAck::Accepted) => {
                let counter = if succeeded {
                    &self.stats.completed
                } else {
                    &self.stats.failed
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ReportAck::Stale) => {
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                warn!(task_id = %task.id, "Result discarded, lease no longer held");
            }
            Err(e) => {
                // The lease will expire and the task is retried
                self.stats.transport_errors.fetch_add(1, Ordering::Relaxed);
                warn!(task_id = %task.id, error = %e, "Failed to report result");
            }
        }
    }
}
