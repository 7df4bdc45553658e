//! Conflict detection and resolution error types.

use thiserror::Error;

use crate::content::{Id, Version};
use crate::merge::MergeResult;

/// Errors that can occur while detecting or resolving conflicts.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConflictError {
    /// No conflict record exists with this ID.
    #[error("Conflict not found: {id}")]
    NotFound {
        /// The conflict ID that was looked up
        id: Id,
    },

    /// The conflict was already resolved; resolution is terminal.
    #[error("Conflict already resolved: {id}")]
    AlreadyResolved { id: Id },

    /// Automatic merge produced conflict hunks; resolution is refused until
    /// the caller supplies explicit merged data.
    ///
    /// Carries the full merge result so the editor can choose lines.
    #[error("Automatic merge produced {} conflicting hunk(s); manual merge required", result.hunks.len())]
    ManualMergeRequired {
        /// The conflict being resolved
        id: Id,
        /// The merge attempt, markers and hunks included
        result: MergeResult,
    },

    /// Automatic merge requested for non-text snapshots.
    ///
    /// Structural merging is never attempted automatically; callers must
    /// supply merged data or pick a side.
    #[error("Snapshots for conflict {id} are not text; supply merged data or pick a side")]
    StructuralMergeUnsupported { id: Id },

    /// The stored conflict record is missing data the resolution needs.
    #[error("Conflict record {id} is unusable: {reason}")]
    InvalidPayload { id: Id, reason: String },

    /// The caller declared a base version ahead of the store's current one.
    ///
    /// Versions only ever come from the store, so a declared version it
    /// never issued is a malformed request, not a divergence.
    #[error(
        "Declared version {declared} for {subject_id} is ahead of the current version {current}"
    )]
    UnknownVersion {
        subject_id: Id,
        declared: Version,
        current: Version,
    },
}

impl ConflictError {
    /// Check if this error indicates a missing conflict record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConflictError::NotFound { .. })
    }

    /// Check if this error means the conflict already reached its terminal
    /// state.
    pub fn is_already_resolved(&self) -> bool {
        matches!(self, ConflictError::AlreadyResolved { .. })
    }

    /// Check if this error asks the caller for manual merge input.
    pub fn is_manual_merge_required(&self) -> bool {
        matches!(self, ConflictError::ManualMergeRequired { .. })
    }

    /// Check if this error was an input rejection.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConflictError::UnknownVersion { .. })
    }
}
