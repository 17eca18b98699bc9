// Error types for the expression pipeline

use thiserror::Error;
use uuid::Uuid;

use crate::eval::EvalError;
use crate::expression::ExpressionStatus;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the store, the task queue and the orchestrator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Submitted text is not a well-formed expression; rejected before it reaches the store
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// No expression with this ID
    #[error("expression not found: {0}")]
    NotFound(Uuid),

    /// The record is terminal or the edge is not part of the state machine
    #[error("invalid transition for expression {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: ExpressionStatus,
        to: ExpressionStatus,
    },

    /// Task was never dispatched, already resolved, or its lease expired
    #[error("unknown or stale task: {0}")]
    UnknownTask(Uuid),

    /// The evaluation capability rejected the expression
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

impl CoreError {
    /// Create an invalid expression error
    pub fn invalid_expression(msg: impl Into<String>) -> Self {
        CoreError::InvalidExpression(msg.into())
    }

    /// Whether the caller supplied bad input (as opposed to referencing missing state)
    pub fn is_client_input(&self) -> bool {
        matches!(self, CoreError::InvalidExpression(_) | CoreError::Evaluation(_))
    }
}
