//! Versioned record storage.
//!
//! This module provides the core [`RecordStore`] trait and the in-memory
//! implementation. The trait defines the only interface the concurrency core
//! uses to touch shared state: versioned reads and compare-and-swap writes.
//! This keeps the conflict and reorder logic independent of the persistence
//! engine, which is a collaborator, not part of this core.
//!
//! The store guarantees per-record read-then-conditional-write, nothing
//! more; multi-record transactions across kinds are deliberately not
//! assumed. Removed records are tombstoned, never hard-deleted, so history
//! stays discoverable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::conflict::ConflictRecord;
use crate::content::{ContentValue, Id, Snapshot, Version};
use crate::position::PlacedItem;

mod cache;
mod errors;
mod in_memory;

pub use cache::{ContainerCache, InMemoryContainerCache};
pub use errors::StoreError;
pub use in_memory::InMemory;

/// The kind of a stored record.
///
/// Content and structure records have separate version sequences and are
/// checked for conflicts independently. Conflict records are the audit
/// trail of the resolution flow itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A shared content field.
    Content,
    /// A placed component inside a container.
    Structure,
    /// A conflict record awaiting or holding a resolution.
    Conflict,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordKind::Content => "content",
            RecordKind::Structure => "structure",
            RecordKind::Conflict => "conflict",
        };
        write!(f, "{s}")
    }
}

/// The data held by a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordData {
    Content(ContentValue),
    Structure(PlacedItem),
    Conflict(ConflictRecord),
}

impl RecordData {
    /// The record kind this data belongs under.
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordData::Content(_) => RecordKind::Content,
            RecordData::Structure(_) => RecordKind::Structure,
            RecordData::Conflict(_) => RecordKind::Conflict,
        }
    }

    /// View this data as a conflict-flow snapshot, when it is one.
    pub fn to_snapshot(&self) -> Option<Snapshot> {
        match self {
            RecordData::Content(c) => Some(Snapshot::Content(c.clone())),
            RecordData::Structure(item) => Some(Snapshot::Structure(item.clone())),
            RecordData::Conflict(_) => None,
        }
    }
}

impl From<Snapshot> for RecordData {
    fn from(snapshot: Snapshot) -> Self {
        match snapshot {
            Snapshot::Content(c) => RecordData::Content(c),
            Snapshot::Structure(item) => RecordData::Structure(item),
        }
    }
}

impl From<ConflictRecord> for RecordData {
    fn from(record: ConflictRecord) -> Self {
        RecordData::Conflict(record)
    }
}

/// A record together with its authoritative version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub data: RecordData,
    pub version: Version,
    /// Set when the record was removed. Tombstoned records stay readable
    /// but are excluded from listings and reject further writes.
    pub tombstoned: bool,
}

/// Store trait abstracting the versioned record storage used by the core.
///
/// Every read/write is a potential suspension point; implementations handle
/// the specifics of how records are persisted (in memory, SQL, a remote
/// service). The core never mutates a record in place without a version
/// check, so the only hard requirement on implementations is an atomic
/// compare-and-swap per record.
///
/// All implementations must be `Send + Sync` to allow sharing across
/// request-scoped tasks. Reads return owned copies to support concurrent
/// access with internal synchronization.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Retrieves a record and its current version.
    ///
    /// Tombstoned records are returned with `tombstoned` set; callers decide
    /// whether a tombstone is acceptable for their operation.
    async fn get(&self, kind: RecordKind, id: &Id) -> Result<VersionedRecord>;

    /// Creates a record at [`Version::initial`].
    ///
    /// Fails with `AlreadyExists` when the ID is taken, including by a
    /// tombstone.
    async fn insert(&self, kind: RecordKind, id: &Id, data: RecordData) -> Result<Version>;

    /// Compare-and-swap write: succeeds only if `expected` equals the
    /// record's current version, and then bumps the version by one.
    ///
    /// On mismatch fails with `VersionMismatch` carrying the current
    /// version, which callers feed into the conflict detect/resolve flow.
    async fn put_if_version(
        &self,
        kind: RecordKind,
        id: &Id,
        expected: Version,
        data: RecordData,
    ) -> Result<Version>;

    /// Marks a record removed, keeping it readable as a tombstone.
    ///
    /// Same compare-and-swap discipline as [`put_if_version`](Self::put_if_version).
    async fn tombstone(&self, kind: RecordKind, id: &Id, expected: Version) -> Result<Version>;

    /// Lists all live (non-tombstoned) records of a kind.
    async fn list(&self, kind: RecordKind) -> Result<Vec<(Id, VersionedRecord)>>;
}
