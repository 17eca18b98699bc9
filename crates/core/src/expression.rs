//! Expression records and their lifecycle
//!
//! ```text
//!            ┌──────────── lease expired ───────────┐
//!            ▼                                      │
//!        Pending ──── dispatched ────▶ InProgress ──┤
//!            │                                      ├──▶ Completed
//!            └──────────────▶ Failed ◀──────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::{CoreError, Result};
use crate::eval;

/// Identifier of the user that submitted an expression
pub type OwnerId = i64;

/// Lifecycle status of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ExpressionStatus {
    /// Waiting in the task queue
    Pending,
    /// Leased to a worker
    InProgress,
    /// Evaluated successfully
    Completed,
    /// Evaluation failed
    Failed,
}

impl ExpressionStatus {
    /// Completed and Failed records never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: ExpressionStatus) -> bool {
        use ExpressionStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Failed)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Pending)
        )
    }
}

impl std::fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A status change together with the payload it carries
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Handed to a worker
    Start,
    /// Lease expired, back to the queue
    Requeue,
    /// Worker reported a value
    Complete { result: f64 },
    /// Worker (or dispatch) reported a failure
    Fail { error: String },
}

impl StatusUpdate {
    pub fn target(&self) -> ExpressionStatus {
        match self {
            Self::Start => ExpressionStatus::InProgress,
            Self::Requeue => ExpressionStatus::Pending,
            Self::Complete { .. } => ExpressionStatus::Completed,
            Self::Fail { .. } => ExpressionStatus::Failed,
        }
    }
}

/// One submitted calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ExpressionRecord {
    /// Unique identifier (UUID v7)
    pub id: Uuid,
    /// Submitting user; absent for anonymous submissions
    pub owner_id: Option<OwnerId>,
    /// The expression text as submitted
    #[cfg_attr(feature = "openapi", schema(example = "2 + 2 * 2"))]
    pub expression: String,
    pub status: ExpressionStatus,
    /// Present only when status is `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    /// Present only when status is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpressionRecord {
    pub(crate) fn new(owner_id: Option<OwnerId>, expression: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            expression,
            status: ExpressionStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status update, enforcing the state machine
    pub(crate) fn apply(&mut self, update: StatusUpdate) -> Result<()> {
        let to = update.target();
        if !self.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }

        match update {
            StatusUpdate::Start | StatusUpdate::Requeue => {}
            StatusUpdate::Complete { result } => self.result = Some(result),
            StatusUpdate::Fail { error } => self.error = Some(error),
        }
        self.status = to;
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Check an expression before it enters the store
///
/// Accepts digits, `+ - * /`, spaces and parentheses, and the text must parse.
pub fn validate_expression(raw: &str) -> Result<()> {
    if let Some((position, ch)) = raw
        .char_indices()
        .find(|(_, c)| !is_allowed_character(*c))
    {
        return Err(CoreError::invalid_expression(format!(
            "character '{}' at position {} is not allowed",
            ch, position
        )));
    }

    eval::parse(raw)
        .map(|_| ())
        .map_err(|e| CoreError::invalid_expression(e.to_string()))
}

fn is_allowed_character(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '+' | '-' | '*' | '/' | ' ' | '(' | ')')
}
