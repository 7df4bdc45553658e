//! Optimistic-concurrency conflict detection and resolution.
//!
//! Editors declare the version their edit was based on; when that base no
//! longer matches the store, the write is not applied. Instead a
//! [`ConflictRecord`] is created holding both sides' snapshots, and the
//! editor (or an automatic three-way merge) decides the outcome. Neither
//! side's data is ever destroyed: both snapshots stay in the record until
//! it is resolved.
//!
//! State machine per record: `Active -> Resolved`, terminal. A resolved
//! conflict never transitions again.

use serde::{Deserialize, Serialize};

use crate::content::{Id, Snapshot, Version};
use crate::store::RecordKind;

mod detector;
mod errors;
mod resolver;

pub use detector::ConflictDetector;
pub use errors::ConflictError;
pub use resolver::{ConflictOutcome, ConflictPage, ConflictResolver};

/// Which class of record diverged.
///
/// Content and structure records carry separate version sequences and are
/// checked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Content,
    Structure,
}

impl ConflictKind {
    /// The store kind holding the conflicted subject.
    pub fn record_kind(self) -> RecordKind {
        match self {
            ConflictKind::Content => RecordKind::Content,
            ConflictKind::Structure => RecordKind::Structure,
        }
    }
}

/// Lifecycle state of a conflict record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    /// Awaiting an editor decision. A timed-out editor simply leaves the
    /// conflict here, discoverable and resolvable later.
    Active,
    /// Strategy applied and the resulting data written. Terminal.
    Resolved,
}

/// How a conflict is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Take the authoritative stored snapshot.
    AcceptRemote,
    /// Take the losing editor's snapshot.
    KeepLocal,
    /// Three-way merge, or caller-supplied merged data.
    Merge,
}

/// Both sides of a conflict, and eventually its outcome.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionPayload {
    /// The losing editor's snapshot, captured at detection time.
    pub local_snapshot: Option<Snapshot>,
    /// The authoritative stored snapshot, captured in the same call.
    pub remote_snapshot: Option<Snapshot>,
    /// Application-supplied common ancestor for text merges.
    pub base_text: Option<String>,
    /// Exactly what the resolving call wrote to the store.
    pub resulting_data: Option<Snapshot>,
}

/// A detected divergence between an editor's base version and the store.
///
/// Created the instant detection finds a version mismatch; persisted (with
/// both snapshots) by the resolver; never mutated after resolution except
/// for audit export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub id: Id,
    pub kind: ConflictKind,
    /// The record that diverged.
    pub subject_id: Id,
    pub container_id: Id,
    /// The stale version the losing editor based its edit on.
    pub local_version: Version,
    /// The store's version at detection time.
    pub remote_version: Version,
    /// RFC3339 detection timestamp.
    pub conflicted_at: String,
    /// The editor whose write lost the race.
    pub conflicted_by: String,
    /// The editor who authored the winning write, taken from the stored
    /// record's own last-modifier field, not from the caller.
    pub remote_author: String,
    pub status: ConflictStatus,
    pub resolution_strategy: Option<ResolutionStrategy>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub payload: ResolutionPayload,
}

impl ConflictRecord {
    /// Whether this conflict still awaits a decision.
    pub fn is_active(&self) -> bool {
        self.status == ConflictStatus::Active
    }
}
