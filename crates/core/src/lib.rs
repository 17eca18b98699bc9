// Calcflow core
//
// Transport-agnostic pieces of the distributed calculator:
// - Expression records and their state machine
// - Expression Store (in-memory registry)
// - Task Queue with leases and a background sweeper
// - Evaluation capability (Evaluator trait + arithmetic parser)
// - Orchestrator tying submission, dispatch and reporting together
// - Wire types shared with the worker

pub mod error;
pub mod eval;
pub mod expression;
pub mod orchestrator;
pub mod protocol;
pub mod queue;
pub mod store;
pub mod sweeper;
pub mod task;
pub mod telemetry;

// Re-exports for convenience
pub use error::{CoreError, Result};
pub use eval::{ArithmeticEvaluator, EvalError, Evaluator};
pub use expression::{
    validate_expression, ExpressionRecord, ExpressionStatus, OwnerId, StatusUpdate,
};
pub use orchestrator::{Orchestrator, Visibility};
pub use protocol::TaskResultRequest;
pub use queue::{TaskQueue, TaskQueueConfig, DEFAULT_LEASE_DURATION};
pub use store::ExpressionStore;
pub use sweeper::{spawn_lease_sweeper, DEFAULT_SWEEP_INTERVAL};
pub use task::{Task, TaskOutcome};
