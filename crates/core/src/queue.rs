//! Task Queue: FIFO of dispatchable tasks with leases
//!
//! A dequeued task is *leased* to the worker that received it. The worker must
//! report before `lease_expiry`; otherwise the task is reclaimed, its record goes
//! back to `Pending` and a retry (with a fresh task ID) is put at the head of
//! the queue. Reports that carry an expired or unknown task ID are rejected, so
//! only one result ever lands on a record.
//!
//! Lock order is always queue state, then store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::expression::{ExpressionRecord, StatusUpdate};
use crate::store::ExpressionStore;
use crate::task::{Task, TaskOutcome};

/// Default time a worker has to report a leased task
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(30);

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueueConfig {
    /// How long a worker holds a task before it is reclaimed
    #[serde(with = "duration_secs")]
    pub lease_duration: Duration,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            lease_duration: DEFAULT_LEASE_DURATION,
        }
    }
}

impl TaskQueueConfig {
    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Task>,
    leased: HashMap<Uuid, Task>,
}

/// FIFO task queue backed by an [`ExpressionStore`]
pub struct TaskQueue {
    store: Arc<ExpressionStore>,
    lease: chrono::Duration,
    state: Mutex<QueueState>,
}

impl TaskQueue {
    pub fn new(store: Arc<ExpressionStore>, config: TaskQueueConfig) -> Self {
        let lease = chrono::Duration::from_std(config.lease_duration)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            store,
            lease,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Append a task to the tail of the queue
    pub fn enqueue(&self, task: Task) {
        debug!(task_id = %task.id, expression_id = %task.expression_id, "Task enqueued");
        self.state.lock().pending.push_back(task);
    }

    /// Lease the oldest pending task, if any
    ///
    /// Expired leases are reclaimed first, so a retry can be handed out by the
    /// same call that notices the expiry.
    pub fn dequeue(&self) -> Option<Task> {
        self.dequeue_at(Utc::now())
    }

    /// Accept a worker's report for a leased task
    ///
    /// Returns the updated record. Fails with [`CoreError::UnknownTask`] when
    /// the task is not currently leased or its lease has expired.
    #[instrument(skip(self, outcome), fields(task_id = %task_id))]
    pub fn report_result(&self, task_id: Uuid, outcome: TaskOutcome) -> Result<ExpressionRecord> {
        self.report_result_at(task_id, outcome, Utc::now())
    }

    /// Return every expired lease to the queue; yields the expired task IDs
    pub fn reclaim_expired(&self) -> Vec<Uuid> {
        let mut state = self.state.lock();
        self.reclaim_locked(&mut state, Utc::now())
    }

    /// Tasks waiting for a worker
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Tasks currently held by workers
    pub fn leased_len(&self) -> usize {
        self.state.lock().leased.len()
    }

    fn dequeue_at(&self, now: DateTime<Utc>) -> Option<Task> {
        let mut state = self.state.lock();
        self.reclaim_locked(&mut state, now);

        while let Some(mut task) = state.pending.pop_front() {
            if let Err(e) = self.store.transition(task.expression_id, StatusUpdate::Start) {
                warn!(
                    task_id = %task.id,
                    expression_id = %task.expression_id,
                    error = %e,
                    "Dropping task for unavailable expression"
                );
                continue;
            }

            task.assigned_at = Some(now);
            task.lease_expiry = Some(now + self.lease);
            state.leased.insert(task.id, task.clone());
            debug!(
                task_id = %task.id,
                expression_id = %task.expression_id,
                attempt = task.attempt,
                "Task leased"
            );
            return Some(task);
        }
        None
    }

    fn report_result_at(
        &self,
        task_id: Uuid,
        outcome: TaskOutcome,
        now: DateTime<Utc>,
    ) -> Result<ExpressionRecord> {
        let mut state = self.state.lock();
        let task = state
            .leased
            .remove(&task_id)
            .ok_or(CoreError::UnknownTask(task_id))?;

        if task.is_expired(now) {
            warn!(expression_id = %task.expression_id, "Rejecting report for expired lease");
            self.requeue_locked(&mut state, task);
            return Err(CoreError::UnknownTask(task_id));
        }

        let update = match outcome {
            TaskOutcome::Success(result) => StatusUpdate::Complete { result },
            TaskOutcome::Failure(error) => StatusUpdate::Fail { error },
        };
        let record = self.store.transition(task.expression_id, update)?;
        info!(
            expression_id = %record.id,
            status = %record.status,
            attempt = task.attempt,
            "Task resolved"
        );
        Ok(record)
    }

    fn reclaim_locked(&self, state: &mut QueueState, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut expired: Vec<Task> = state
            .leased
            .values()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect();
        if expired.is_empty() {
            return Vec::new();
        }

        // Newest first, so after push_front the oldest assignment is at the head
        expired.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then(b.id.cmp(&a.id)));

        let mut ids = Vec::with_capacity(expired.len());
        for task in expired {
            state.leased.remove(&task.id);
            ids.push(task.id);
            self.requeue_locked(state, task);
        }
        info!(count = ids.len(), "Reclaimed expired task leases");
        ids
    }

    fn requeue_locked(&self, state: &mut QueueState, task: Task) {
        match self.store.transition(task.expression_id, StatusUpdate::Requeue) {
            Ok(_) => {
                let retry = task.retry();
                debug!(
                    expired_task_id = %task.id,
                    task_id = %retry.id,
                    attempt = retry.attempt,
                    "Task re-enqueued after lease expiry"
                );
                state.pending.push_front(retry);
            }
            Err(e) => warn!(
                task_id = %task.id,
                expression_id = %task.expression_id,
                error = %e,
                "Discarding expired task"
            ),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
