//! Execution error taxonomy

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the execution state machine.
///
/// Precondition failures leave the execution unchanged; adapter failures are
/// logged at the call site and never propagate as a transition failure.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("zone {0} not found")]
    ZoneNotFound(Uuid),

    #[error("recipe {0} not found")]
    RecipeNotFound(Uuid),

    #[error("recipe {recipe_id} is invalid: {reason}")]
    RecipeInvalid { recipe_id: Uuid, reason: String },

    #[error("zone {0} already has a live recipe execution")]
    ZoneBusy(Uuid),

    #[error("recipe execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("no pending approval for execution {0}")]
    NoPendingApproval(Uuid),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Result alias for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;
