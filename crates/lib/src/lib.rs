//!
//! Tessera: the concurrency core of a multi-editor visual page builder.
//! Several editors reposition content blocks and edit shared content fields
//! at the same time; this library keeps that state consistent without locks.
//!
//! ## Core Concepts
//!
//! * **Records (`store::RecordStore`)**: A pluggable versioned record store.
//!   Every record carries a monotonic [`Version`](content::Version) and all
//!   writes are compare-and-swap on that version.
//! * **Positions (`position`)**: Pure functions over the ordered placement of
//!   components inside a container: insertion points, collision resolution,
//!   and compaction of sparse order sequences.
//! * **Reordering (`reorder::ReorderCoordinator`)**: Applies a batch of
//!   position mutations through the store and emits one batched change
//!   notification per successful batch.
//! * **Conflicts (`conflict`)**: Optimistic-concurrency detection
//!   (`ConflictDetector`) and resolution (`ConflictResolver`) for shared
//!   records, with a deterministic line-based three-way merge (`merge`).
//! * **Events (`events::Broadcaster`)**: Best-effort change notifications;
//!   a failed broadcast never rolls back the write that triggered it.
//!
//! Everything outside this core (authentication, routing, rendering) is a
//! collaborator consumed through the traits in [`store`] and [`events`].

pub mod clock;
pub mod conflict;
pub mod constants;
pub mod content;
pub mod events;
pub mod merge;
pub mod position;
pub mod reorder;
#[cfg(feature = "service")]
pub mod service;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use content::{ContentValue, Id, Snapshot, Version};

/// Result type used throughout the Tessera library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Tessera library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured record store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured placement errors from the position module
    #[error(transparent)]
    Position(position::PositionError),

    /// Structured reorder errors from the reorder module
    #[error(transparent)]
    Reorder(reorder::ReorderError),

    /// Structured conflict detection/resolution errors from the conflict module
    #[error(transparent)]
    Conflict(conflict::ConflictError),

    /// Structured HTTP service errors from the service module
    #[cfg(feature = "service")]
    #[error(transparent)]
    Service(service::ServiceError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Store(_) => "store",
            Error::Position(_) => "position",
            Error::Reorder(_) => "reorder",
            Error::Conflict(_) => "conflict",
            #[cfg(feature = "service")]
            Error::Service(_) => "service",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(e) => e.is_not_found(),
            Error::Conflict(e) => e.is_not_found(),
            Error::Reorder(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a compare-and-swap version mismatch.
    ///
    /// Version conflicts are not fatal: callers route them into the
    /// detect/resolve flow instead of surfacing them as failures.
    pub fn is_version_conflict(&self) -> bool {
        match self {
            Error::Store(e) => e.is_version_mismatch(),
            _ => false,
        }
    }

    /// Check if this error was an input rejection.
    pub fn is_validation(&self) -> bool {
        match self {
            Error::Position(e) => e.is_validation(),
            Error::Reorder(e) => e.is_validation(),
            Error::Conflict(e) => e.is_validation(),
            _ => false,
        }
    }

    /// Check if this error indicates automatic merge needs manual input.
    pub fn is_manual_merge_required(&self) -> bool {
        match self {
            Error::Conflict(e) => e.is_manual_merge_required(),
            _ => false,
        }
    }

    /// Check if this error is retryable (collaborator unavailable).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_unavailable(),
            Error::Io(_) => true,
            _ => false,
        }
    }
}

// Conversion implementations from module error types

impl From<store::StoreError> for Error {
    fn from(err: store::StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<position::PositionError> for Error {
    fn from(err: position::PositionError) -> Self {
        Error::Position(err)
    }
}

impl From<reorder::ReorderError> for Error {
    fn from(err: reorder::ReorderError) -> Self {
        Error::Reorder(err)
    }
}

impl From<conflict::ConflictError> for Error {
    fn from(err: conflict::ConflictError) -> Self {
        Error::Conflict(err)
    }
}

#[cfg(feature = "service")]
impl From<service::ServiceError> for Error {
    fn from(err: service::ServiceError) -> Self {
        Error::Service(err)
    }
}
