//! Dispatchable units of work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A unit of work derived from an expression record
///
/// Evaluation is monolithic: one task carries the whole expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Task {
    /// Task ID; a fresh one is minted on every re-dispatch after lease expiry
    pub id: Uuid,
    /// Record this task reports into
    pub expression_id: Uuid,
    /// Expression text to evaluate
    #[cfg_attr(feature = "openapi", schema(example = "2 + 2 * 2"))]
    pub expression: String,
    /// Dispatch attempt, starting at 1
    pub attempt: u32,
    /// When the task was handed to a worker
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Deadline for the worker's report
    #[serde(default)]
    pub lease_expiry: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(expression_id: Uuid, expression: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            expression_id,
            expression: expression.into(),
            attempt: 1,
            assigned_at: None,
            lease_expiry: None,
        }
    }

    /// Copy of this task for the next dispatch attempt
    pub(crate) fn retry(&self) -> Self {
        Self {
            id: Uuid::now_v7(),
            expression_id: self.expression_id,
            expression: self.expression.clone(),
            attempt: self.attempt + 1,
            assigned_at: None,
            lease_expiry: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.lease_expiry.is_some_and(|deadline| deadline <= now)
    }
}

/// What a worker reports back for a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(f64),
    Failure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_mints_new_id() {
        let task = Task::new(Uuid::now_v7(), "1 + 1");
        let retry = task.retry();
        assert_ne!(retry.id, task.id);
        assert_eq!(retry.expression_id, task.expression_id);
        assert_eq!(retry.attempt, 2);
        assert!(retry.lease_expiry.is_none());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let mut task = Task::new(Uuid::now_v7(), "1");
        assert!(!task.is_expired(now));

        task.lease_expiry = Some(now + chrono::Duration::seconds(5));
        assert!(!task.is_expired(now));
        assert!(task.is_expired(now + chrono::Duration::seconds(5)));
    }
}
