//! Placement error types.

use thiserror::Error;

use crate::content::Id;

/// Errors from the pure placement calculator.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PositionError {
    /// Collision resolution was handed items from more than one container.
    #[error("Items span multiple containers: expected {expected}, found {found}")]
    MixedContainers {
        /// Container of the first item
        expected: Id,
        /// The other container encountered
        found: Id,
    },
}

impl PositionError {
    /// Check if this error is an input rejection (no store access happened).
    pub fn is_validation(&self) -> bool {
        matches!(self, PositionError::MixedContainers { .. })
    }
}
