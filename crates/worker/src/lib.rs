// Calcflow worker
//
// Polls the control plane for tasks, evaluates them and reports results.
// `computing_power` loops run concurrently inside one process.

pub mod client;
pub mod config;
pub mod poller;
pub mod pool;

pub use client::{HttpTaskSource, LocalTaskSource, ReportAck, TaskSource, WorkerError};
pub use config::WorkerConfig;
pub use poller::{PollerConfig, TaskPoller};
pub use pool::{PoolStatsSnapshot, WorkerPool, WorkerPoolConfig, WorkerPoolError};
