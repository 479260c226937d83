//! Store error types.

use thiserror::Error;

use rampart_core::error::ValidationError;
use rampart_core::types::MissileId;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad input; nothing was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Outcomes are insert-once per munition.
    #[error("outcome already recorded for missile {0}")]
    DuplicateOutcome(MissileId),

    /// Transient or fatal database failure; callers retry or exit per the
    /// error-handling policy.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}
