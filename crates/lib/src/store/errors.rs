//! Record store error types.
//!
//! This module defines structured error types for versioned record
//! operations, providing better error context and type safety compared to
//! string-based errors.

use thiserror::Error;

use crate::content::{Id, Version};
use crate::store::RecordKind;

/// Errors that can occur during record store operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found by kind and ID.
    #[error("Record not found: {kind} {id}")]
    RecordNotFound {
        /// The kind of record looked up
        kind: RecordKind,
        /// The ID that was not found
        id: Id,
    },

    /// Insert attempted for an ID that already holds a record.
    #[error("Record already exists: {kind} {id}")]
    AlreadyExists { kind: RecordKind, id: Id },

    /// Compare-and-swap write rejected: the caller's declared version does
    /// not match the store's current version.
    ///
    /// Not fatal. Callers route this into the conflict detect/resolve flow.
    #[error("Version mismatch for {kind} {id}: expected {expected}, current {current}")]
    VersionMismatch {
        kind: RecordKind,
        id: Id,
        /// The version the caller declared
        expected: Version,
        /// The store's current version
        current: Version,
    },

    /// Write attempted against a tombstoned record.
    #[error("Record is tombstoned: {kind} {id}")]
    Tombstoned { kind: RecordKind, id: Id },

    /// Stored data does not match the requested record kind.
    #[error("Record {id} holds {actual} data, not {expected}")]
    KindMismatch {
        id: Id,
        expected: RecordKind,
        actual: RecordKind,
    },

    /// The store collaborator is unreachable or failing.
    ///
    /// Retryable; propagated to the caller unchanged with no local
    /// compensation.
    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RecordNotFound { .. })
    }

    /// Check if this error is a compare-and-swap rejection.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, StoreError::VersionMismatch { .. })
    }

    /// Check if this error indicates the record already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// Check if this error indicates a write against a tombstone.
    pub fn is_tombstoned(&self) -> bool {
        matches!(self, StoreError::Tombstoned { .. })
    }

    /// Check if this error is a retryable collaborator failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}
