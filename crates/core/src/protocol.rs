// Worker <-> control plane wire types
// Decision: GET /internal/task returns a Task as JSON (204 when idle)
// Decision: POST /internal/task carries exactly one of `result` or `error`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::task::TaskOutcome;

/// Body of `POST /internal/task`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TaskResultRequest {
    /// Task ID from the lease
    pub id: Uuid,
    /// Computed value on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResultRequest {
    pub fn new(id: Uuid, outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            TaskOutcome::Failure(message) => Self {
                id,
                result: None,
                error: Some(message),
            },
        }
    }

    /// Convert to an outcome; `None` unless exactly one of `result`/`error` is set
    pub fn outcome(self) -> Option<TaskOutcome> {
        match (self.result, self.error) {
            (Some(value), None) => Some(TaskOutcome::Success(value)),
            (None, Some(message)) => Some(TaskOutcome::Failure(message)),
            _ => None,
        }
    }
}
