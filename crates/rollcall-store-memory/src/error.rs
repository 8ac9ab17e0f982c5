//! Error types for memory store operations.

use rollcall_core::EntityClass;
use thiserror::Error;

/// Errors raised by [`MemoryRemote`](crate::MemoryRemote).
#[derive(Error, Debug)]
pub enum StoreError {
    /// No profile is signed in.
    #[error("User not authenticated")]
    Unauthenticated,

    /// A row addressed by key does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Table the lookup ran against.
        entity: EntityClass,
        /// Key that was looked up.
        key: String,
    },

    /// The signed-in profile may not perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A uniqueness constraint would be violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payload references missing rows or is malformed.
    #[error("Invalid payload: {0}")]
    Invalid(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: EntityClass, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
