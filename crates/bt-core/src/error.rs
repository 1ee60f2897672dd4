//! Errors surfaced to callers of the engine.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{BabyId, UserId, ValidationError};

/// Engine errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A baby, user, event or share token does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The user is not a parent of the baby.
    #[error("user {user} has no access to baby {baby}")]
    Unauthorized { user: UserId, baby: BabyId },

    /// The user is already a parent of the baby.
    #[error("user {user} is already a parent of baby {baby}")]
    AlreadyParent { user: UserId, baby: BabyId },

    /// Malformed or missing input, detected before any store access.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The underlying store failed.
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl TrackerError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
