//! Version-mismatch detection.

use std::sync::Arc;

use crate::clock::Clock;
use crate::content::{Id, Version};
use crate::store::RecordStore;
use crate::{Result, Snapshot};

use super::{ConflictError, ConflictKind, ConflictRecord, ConflictStatus, ResolutionPayload};

/// Fallback author when the stored snapshot carries no last-modifier
/// (content values have no authorship field).
const UNKNOWN_AUTHOR: &str = "unknown";

/// Compares an editor's declared base version against the authoritative
/// stored version.
///
/// Detection is read-only: the produced [`ConflictRecord`] is not persisted
/// here. Persistence is the resolver's job, once the remote-data snapshot
/// has also been captured, so the two are stored together.
pub struct ConflictDetector {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns `None` when the stored version still equals `expected` (the
    /// caller proceeds to write), or an `Active` conflict record when the
    /// subject has moved on.
    ///
    /// A missing subject propagates as not-found; detection is only
    /// meaningful for records that exist. A declared version ahead of the
    /// store's is rejected outright: the store is the only version issuer,
    /// so such a request is malformed rather than divergent.
    pub async fn detect(
        &self,
        container_id: &Id,
        subject_id: &Id,
        kind: ConflictKind,
        expected: Version,
        actor_id: &str,
    ) -> Result<Option<ConflictRecord>> {
        let stored = self.store.get(kind.record_kind(), subject_id).await?;
        if stored.version == expected {
            return Ok(None);
        }
        if expected > stored.version {
            return Err(ConflictError::UnknownVersion {
                subject_id: subject_id.clone(),
                declared: expected,
                current: stored.version,
            }
            .into());
        }

        let remote_author = stored
            .data
            .to_snapshot()
            .as_ref()
            .and_then(Snapshot::last_modified_by)
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();

        tracing::debug!(
            subject = %subject_id,
            expected = %expected,
            current = %stored.version,
            "version mismatch detected"
        );

        Ok(Some(ConflictRecord {
            id: Id::generate(),
            kind,
            subject_id: subject_id.clone(),
            container_id: container_id.clone(),
            local_version: expected,
            remote_version: stored.version,
            conflicted_at: self.clock.now_rfc3339(),
            conflicted_by: actor_id.to_string(),
            remote_author,
            status: ConflictStatus::Active,
            resolution_strategy: None,
            resolved_by: None,
            resolved_at: None,
            payload: ResolutionPayload::default(),
        }))
    }
}
