// Task source: where a worker gets tasks and sends results
// Decision: Workers only see the TaskSource trait; HTTP is one implementation
// Decision: A 404 on report means the lease was lost, which is not a transport error

use async_trait::async_trait;
use calcflow_core::{CoreError, Orchestrator, Task, TaskResultRequest};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors talking to the control plane
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Connection failure, timeout or unexpected status
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for WorkerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            WorkerError::Decode(e.to_string())
        } else {
            WorkerError::Transport(e.to_string())
        }
    }
}

/// How the control plane answered a result report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAck {
    /// Result recorded
    Accepted,
    /// Task unknown or its lease expired; the result was discarded
    Stale,
}

#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Lease the next task, `None` when the queue is empty
    async fn fetch_task(&self) -> Result<Option<Task>, WorkerError>;

    /// Report the outcome of a leased task
    async fn report(&self, report: TaskResultRequest) -> Result<ReportAck, WorkerError>;
}

/// Talks to the control plane's `/internal/task` endpoint
pub struct HttpTaskSource {
    client: reqwest::Client,
    task_url: String,
}

impl HttpTaskSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            task_url: format!("{}/internal/task", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn fetch_task(&self) -> Result<Option<Task>, WorkerError> {
        let response = self.client.get(&self.task_url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<Task>().await?)),
            StatusCode::NO_CONTENT => Ok(None),
            status => Err(WorkerError::Transport(format!(
                "unexpected status {} from GET {}",
                status, self.task_url
            ))),
        }
    }

    async fn report(&self, report: TaskResultRequest) -> Result<ReportAck, WorkerError> {
        let response = self.client.post(&self.task_url).json(&report).send().await?;
        match response.status() {
            status if status.is_success() => Ok(ReportAck::Accepted),
            StatusCode::NOT_FOUND => Ok(ReportAck::Stale),
            status => Err(WorkerError::Transport(format!(
                "unexpected status {} from POST {}",
                status, self.task_url
            ))),
        }
    }
}

/// Pulls tasks straight from an in-process [`Orchestrator`]
///
/// Used to run workers inside the control plane process and in tests.
pub struct LocalTaskSource {
    orchestrator: Orchestrator,
}

impl LocalTaskSource {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl TaskSource for LocalTaskSource {
    async fn fetch_task(&self) -> Result<Option<Task>, WorkerError> {
        Ok(self.orchestrator.next_task())
    }

    async fn report(&self, report: TaskResultRequest) -> Result<ReportAck, WorkerError> {
        let task_id = report.id;
        let outcome = report.outcome().ok_or_else(|| {
            WorkerError::Transport(format!("malformed report for task {}", task_id))
        })?;
        match self.orchestrator.report(task_id, outcome) {
            Ok(_) => Ok(ReportAck::Accepted),
            Err(CoreError::UnknownTask(_)) => Ok(ReportAck::Stale),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Report rejected by orchestrator");
                Err(WorkerError::Transport(e.to_string()))
            }
        }
    }
}
