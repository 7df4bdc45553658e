//! Reorder coordination error types.

use thiserror::Error;

use crate::content::Id;

/// Errors from batch reorder coordination.
///
/// Per-operation compare-and-swap failures are not errors at this level:
/// they are reported inside the batch report so the caller can retry the
/// failed subset. The variants here abort before any store write.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReorderError {
    /// A malformed operation was found during pre-validation; the whole
    /// batch is rejected with no partial writes.
    #[error("Invalid reorder operation at index {index}: {reason}")]
    InvalidOperation {
        /// Position of the offending operation in the batch
        index: usize,
        reason: String,
    },

    /// The drop gesture failed validation.
    #[error("Invalid drop: {reason}")]
    InvalidDrop { reason: String },

    /// A placed item this operation needs does not exist.
    #[error("Placed item not found: {id}")]
    ItemNotFound { id: Id },
}

impl ReorderError {
    /// Check if this error was a pre-store input rejection.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReorderError::InvalidOperation { .. } | ReorderError::InvalidDrop { .. }
        )
    }

    /// Check if this error indicates a missing item.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReorderError::ItemNotFound { .. })
    }
}
