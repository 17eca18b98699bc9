//! Orchestrator: the single entry point the HTTP surfaces call
//!
//! Wires validation, the store and the queue together. Submissions are
//! validated before a record exists, so a rejected expression leaves no trace.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::expression::{validate_expression, ExpressionRecord, OwnerId};
use crate::queue::{TaskQueue, TaskQueueConfig};
use crate::store::ExpressionStore;
use crate::task::{Task, TaskOutcome};

/// Which records a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every record (anonymous deployments)
    All,
    /// Only records submitted by this user
    Owner(OwnerId),
}

impl Visibility {
    fn permits(self, record: &ExpressionRecord) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Owner(owner) => record.owner_id == Some(owner),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<ExpressionStore>,
    queue: Arc<TaskQueue>,
}

impl Orchestrator {
    pub fn new(config: TaskQueueConfig) -> Self {
        let store = Arc::new(ExpressionStore::new());
        let queue = Arc::new(TaskQueue::new(Arc::clone(&store), config));
        Self { store, queue }
    }

    pub fn store(&self) -> &Arc<ExpressionStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Validate, record and enqueue an expression; returns the new record ID
    #[instrument(skip(self, raw), fields(owner_id = ?owner_id))]
    pub fn submit(&self, owner_id: Option<OwnerId>, raw: &str) -> Result<Uuid> {
        validate_expression(raw)?;

        let id = self.store.create(owner_id, raw);
        self.queue.enqueue(Task::new(id, raw));
        info!(expression_id = %id, "Expression accepted");
        Ok(id)
    }

    /// Fetch one record; records outside `visibility` look missing
    pub fn get(&self, id: Uuid, visibility: Visibility) -> Result<ExpressionRecord> {
        self.store
            .get(id)
            .filter(|record| visibility.permits(record))
            .ok_or(CoreError::NotFound(id))
    }

    /// Snapshot of the visible records, oldest first
    pub fn list(&self, visibility: Visibility) -> Vec<ExpressionRecord> {
        match visibility {
            Visibility::All => self.store.list_all(),
            Visibility::Owner(owner) => self.store.list_by_owner(owner),
        }
    }

    /// Lease the next task to a worker
    pub fn next_task(&self) -> Option<Task> {
        self.queue.dequeue()
    }

    /// Record a worker's outcome for a leased task
    pub fn report(&self, task_id: Uuid, outcome: TaskOutcome) -> Result<ExpressionRecord> {
        self.queue.report_result(task_id, outcome)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(TaskQueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{ArithmeticEvaluator, Evaluator};
    use crate::expression::ExpressionStatus;
    use std::collections::HashSet;

    /// Drain the queue the way a worker would
    fn run_worker(orchestrator: &Orchestrator) {
        let evaluator = ArithmeticEvaluator;
        while let Some(task) = orchestrator.next_task() {
            let outcome = match evaluator.evaluate(&task.expression) {
                Ok(value) => TaskOutcome::Success(value),
                Err(e) => TaskOutcome::Failure(e.to_string()),
            };
            orchestrator.report(task.id, outcome).unwrap();
        }
    }

    #[test]
    fn test_submit_creates_pending_record() {
        let orchestrator = Orchestrator::default();
        let id = orchestrator.submit(None, "2 + 2 * 2").unwrap();

        let record = orchestrator.get(id, Visibility::All).unwrap();
        assert_eq!(record.status, ExpressionStatus::Pending);
        assert_eq!(record.expression, "2 + 2 * 2");
        assert_eq!(orchestrator.queue().pending_len(), 1);
    }

    #[test]
    fn test_invalid_submission_leaves_no_record() {
        let orchestrator = Orchestrator::default();
        let err = orchestrator.submit(None, "2 + * 2").unwrap_err();
        assert!(matches!(err, CoreError::InvalidExpression(_)));
        assert!(orchestrator.store().is_empty());
        assert_eq!(orchestrator.queue().pending_len(), 0);
    }

    #[test]
    fn test_end_to_end_evaluation() {
        let orchestrator = Orchestrator::default();
        let a = orchestrator.submit(None, "2 + 2 * 2").unwrap();
        let b = orchestrator.submit(None, "(2 + 2) * 2").unwrap();
        let c = orchestrator.submit(None, "10 / 0").unwrap();

        run_worker(&orchestrator);

        let a = orchestrator.get(a, Visibility::All).unwrap();
        assert_eq!(a.status, ExpressionStatus::Completed);
        assert_eq!(a.result, Some(6.0));

        let b = orchestrator.get(b, Visibility::All).unwrap();
        assert_eq!(b.result, Some(8.0));

        let c = orchestrator.get(c, Visibility::All).unwrap();
        assert_eq!(c.status, ExpressionStatus::Failed);
        assert_eq!(c.error.as_deref(), Some("division by zero"));
        assert!(c.result.is_none());
    }

    #[test]
    fn test_long_flat_expression_is_accepted_and_evaluated() {
        let orchestrator = Orchestrator::default();
        let id = orchestrator
            .submit(None, &vec!["1"; 200_000].join("+"))
            .unwrap();

        run_worker(&orchestrator);

        let record = orchestrator.get(id, Visibility::All).unwrap();
        assert_eq!(record.status, ExpressionStatus::Completed);
        assert_eq!(record.result, Some(200_000.0));
    }

    #[test]
    fn test_duplicate_submissions_are_independent() {
        let orchestrator = Orchestrator::default();
        let first = orchestrator.submit(None, "1 + 1").unwrap();
        let second = orchestrator.submit(None, "1 + 1").unwrap();
        assert_ne!(first, second);

        let task = orchestrator.next_task().unwrap();
        assert_eq!(task.expression_id, first);
        orchestrator.report(task.id, TaskOutcome::Success(2.0)).unwrap();

        let second = orchestrator.get(second, Visibility::All).unwrap();
        assert_eq!(second.status, ExpressionStatus::Pending);
    }

    #[test]
    fn test_owner_visibility() {
        let orchestrator = Orchestrator::default();
        let mine = orchestrator.submit(Some(1), "1").unwrap();
        let theirs = orchestrator.submit(Some(2), "2").unwrap();

        assert!(orchestrator.get(mine, Visibility::Owner(1)).is_ok());
        assert_eq!(
            orchestrator.get(theirs, Visibility::Owner(1)).unwrap_err(),
            CoreError::NotFound(theirs)
        );

        let listed: Vec<Uuid> = orchestrator
            .list(Visibility::Owner(1))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, vec![mine]);
        assert_eq!(orchestrator.list(Visibility::All).len(), 2);
    }

    #[test]
    fn test_get_unknown_id() {
        let orchestrator = Orchestrator::default();
        let id = Uuid::now_v7();
        assert_eq!(
            orchestrator.get(id, Visibility::All),
            Err(CoreError::NotFound(id))
        );
    }

    #[test]
    fn test_concurrent_submissions_are_unique_and_listed() {
        let orchestrator = Orchestrator::default();
        let handles: Vec<_> = (0..10)
            .map(|n| {
                let orchestrator = orchestrator.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| orchestrator.submit(None, &format!("{} + {}", n, i)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }
        assert_eq!(ids.len(), 1000);

        let listed: HashSet<Uuid> = orchestrator
            .list(Visibility::All)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, ids);
        assert_eq!(orchestrator.queue().pending_len(), 1000);
    }
}
