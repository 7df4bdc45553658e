//! Conflict persistence and resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::Clock;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::content::{ContentValue, Id, Snapshot, Version};
use crate::events::{Broadcaster, Event, EventKind, publish_best_effort};
use crate::merge;
use crate::store::{RecordData, RecordKind, RecordStore, StoreError};
use crate::{Error, Result};

use super::{
    ConflictDetector, ConflictError, ConflictKind, ConflictRecord, ConflictStatus,
    ResolutionStrategy,
};

/// Result of a conflict-creation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictOutcome {
    /// Versions still match; the caller proceeds with its original write.
    NoConflict,
    /// A conflict record was persisted; the caller routes the editor into
    /// the resolution flow.
    Conflict {
        record: ConflictRecord,
        remote_snapshot: Snapshot,
    },
}

/// One page of a conflict listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPage {
    pub conflicts: Vec<ConflictRecord>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

/// State machine around a single conflict: stores it, accepts a resolution
/// strategy, computes the resulting value, persists it with a new version,
/// and marks the conflict resolved.
///
/// Concurrency safety comes entirely from the store's compare-and-swap: two
/// editors resolving the same conflict race on the subject write, and the
/// loser's attempt fails with a version mismatch before any conflict-record
/// update happens.
pub struct ConflictResolver {
    store: Arc<dyn RecordStore>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
    detector: ConflictDetector,
}

impl ConflictResolver {
    pub fn new(
        store: Arc<dyn RecordStore>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let detector = ConflictDetector::new(store.clone(), clock.clone());
        Self {
            store,
            broadcaster,
            clock,
            detector,
        }
    }

    /// The detector this resolver runs, for callers that only want the
    /// read-only check.
    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Runs detection and, on a mismatch, persists an `Active` conflict
    /// record carrying both snapshots (and the application-supplied merge
    /// base, when given).
    ///
    /// Publishes a `conflict_detected` event after the record is stored.
    /// Returns [`ConflictOutcome::NoConflict`] when the caller's version is
    /// still current.
    pub async fn create_conflict(
        &self,
        container_id: &Id,
        subject_id: &Id,
        kind: ConflictKind,
        expected_version: Version,
        local_snapshot: Snapshot,
        base_text: Option<String>,
        actor_id: &str,
    ) -> Result<ConflictOutcome> {
        let Some(mut record) = self
            .detector
            .detect(container_id, subject_id, kind, expected_version, actor_id)
            .await?
        else {
            return Ok(ConflictOutcome::NoConflict);
        };

        // Capture the authoritative snapshot so both sides are stored
        // together in one write.
        let stored = self.store.get(kind.record_kind(), subject_id).await?;
        let remote_snapshot =
            stored
                .data
                .to_snapshot()
                .ok_or_else(|| ConflictError::InvalidPayload {
                    id: record.id.clone(),
                    reason: format!("subject {subject_id} is not a content or structure record"),
                })?;
        record.remote_version = stored.version;
        record.payload.local_snapshot = Some(local_snapshot);
        record.payload.remote_snapshot = Some(remote_snapshot.clone());
        record.payload.base_text = base_text;

        let data: RecordData = record.clone().into();
        self.store
            .insert(RecordKind::Conflict, &record.id, data)
            .await?;

        publish_best_effort(
            self.broadcaster.as_ref(),
            Event {
                id: Id::generate(),
                kind: EventKind::ConflictDetected,
                container_id: container_id.clone(),
                actor_id: actor_id.to_string(),
                timestamp: self.clock.now_rfc3339(),
                payload: json!({
                    "conflictId": record.id,
                    "subjectId": subject_id,
                    "localVersion": record.local_version,
                    "remoteVersion": record.remote_version,
                }),
            },
        );

        Ok(ConflictOutcome::Conflict {
            record,
            remote_snapshot,
        })
    }

    /// Applies a resolution strategy to an active conflict.
    ///
    /// On success exactly one subject write and one conflict-record update
    /// occur; every failure path returns before the first write. The subject
    /// is stamped `max(local_version, remote_version) + 1`, which under the
    /// store's compare-and-swap is the version following the remote side.
    pub async fn resolve(
        &self,
        conflict_id: &Id,
        strategy: ResolutionStrategy,
        merged_data: Option<Snapshot>,
        actor_id: &str,
    ) -> Result<Snapshot> {
        let envelope = match self.store.get(RecordKind::Conflict, conflict_id).await {
            Ok(envelope) => envelope,
            Err(Error::Store(StoreError::RecordNotFound { .. })) => {
                return Err(ConflictError::NotFound {
                    id: conflict_id.clone(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };
        let RecordData::Conflict(mut record) = envelope.data else {
            return Err(ConflictError::InvalidPayload {
                id: conflict_id.clone(),
                reason: "record is not a conflict".to_string(),
            }
            .into());
        };
        if !record.is_active() {
            return Err(ConflictError::AlreadyResolved {
                id: conflict_id.clone(),
            }
            .into());
        }

        let resulting = self.compute_resulting(&record, strategy, merged_data)?;

        // Subject write first: if it loses a race, the conflict stays
        // active and resolvable.
        let subject_kind = record.kind.record_kind();
        let new_version = self
            .store
            .put_if_version(
                subject_kind,
                &record.subject_id,
                record.remote_version,
                resulting.clone().into(),
            )
            .await?;
        debug_assert_eq!(
            new_version,
            record.local_version.max(record.remote_version).next()
        );

        record.status = ConflictStatus::Resolved;
        record.resolution_strategy = Some(strategy);
        record.resolved_by = Some(actor_id.to_string());
        record.resolved_at = Some(self.clock.now_rfc3339());
        record.payload.resulting_data = Some(resulting.clone());
        self.store
            .put_if_version(
                RecordKind::Conflict,
                conflict_id,
                envelope.version,
                record.clone().into(),
            )
            .await?;

        let event_kind = match record.kind {
            ConflictKind::Content => EventKind::ContentUpdated,
            ConflictKind::Structure => EventKind::StructureUpdated,
        };
        publish_best_effort(
            self.broadcaster.as_ref(),
            Event {
                id: Id::generate(),
                kind: event_kind,
                container_id: record.container_id.clone(),
                actor_id: actor_id.to_string(),
                timestamp: self.clock.now_rfc3339(),
                payload: json!({
                    "conflictId": conflict_id,
                    "subjectId": record.subject_id,
                    "newVersion": new_version,
                }),
            },
        );

        Ok(resulting)
    }

    /// Fetches a single conflict record.
    pub async fn get(&self, conflict_id: &Id) -> Result<ConflictRecord> {
        let envelope = match self.store.get(RecordKind::Conflict, conflict_id).await {
            Ok(envelope) => envelope,
            Err(Error::Store(StoreError::RecordNotFound { .. })) => {
                return Err(ConflictError::NotFound {
                    id: conflict_id.clone(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };
        match envelope.data {
            RecordData::Conflict(record) => Ok(record),
            _ => Err(ConflictError::InvalidPayload {
                id: conflict_id.clone(),
                reason: "record is not a conflict".to_string(),
            }
            .into()),
        }
    }

    /// Lists conflicts, optionally filtered by container and status,
    /// paginated with pages starting at 1.
    pub async fn list(
        &self,
        container_id: Option<&Id>,
        status: Option<ConflictStatus>,
        page: Option<usize>,
        per_page: Option<usize>,
    ) -> Result<ConflictPage> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut conflicts: Vec<ConflictRecord> = self
            .store
            .list(RecordKind::Conflict)
            .await?
            .into_iter()
            .filter_map(|(_, envelope)| match envelope.data {
                RecordData::Conflict(record) => Some(record),
                _ => None,
            })
            .filter(|record| container_id.is_none_or(|c| record.container_id == *c))
            .filter(|record| status.is_none_or(|s| record.status == s))
            .collect();
        conflicts.sort_by(|a, b| a.conflicted_at.cmp(&b.conflicted_at));

        let total = conflicts.len();
        let start = (page - 1).saturating_mul(per_page).min(total);
        let end = start.saturating_add(per_page).min(total);
        Ok(ConflictPage {
            conflicts: conflicts[start..end].to_vec(),
            page,
            per_page,
            total,
        })
    }

    /// Computes the resulting snapshot for a strategy without writing
    /// anything.
    fn compute_resulting(
        &self,
        record: &ConflictRecord,
        strategy: ResolutionStrategy,
        merged_data: Option<Snapshot>,
    ) -> Result<Snapshot> {
        let invalid = |reason: &str| ConflictError::InvalidPayload {
            id: record.id.clone(),
            reason: reason.to_string(),
        };
        match strategy {
            ResolutionStrategy::AcceptRemote => record
                .payload
                .remote_snapshot
                .clone()
                .ok_or_else(|| invalid("missing remote snapshot").into()),
            ResolutionStrategy::KeepLocal => record
                .payload
                .local_snapshot
                .clone()
                .ok_or_else(|| invalid("missing local snapshot").into()),
            ResolutionStrategy::Merge => {
                // Manual resolution already performed upstream.
                if let Some(merged) = merged_data {
                    return Ok(merged);
                }
                let local = record
                    .payload
                    .local_snapshot
                    .as_ref()
                    .ok_or_else(|| invalid("missing local snapshot"))?;
                let remote = record
                    .payload
                    .remote_snapshot
                    .as_ref()
                    .ok_or_else(|| invalid("missing remote snapshot"))?;
                match (local.as_text(), remote.as_text()) {
                    (Some(local_text), Some(remote_text)) => {
                        let base = record.payload.base_text.as_deref().unwrap_or("");
                        let result = merge::merge(base, local_text, remote_text);
                        if result.has_conflicts {
                            return Err(ConflictError::ManualMergeRequired {
                                id: record.id.clone(),
                                result,
                            }
                            .into());
                        }
                        Ok(Snapshot::Content(ContentValue::Text(result.merged_text)))
                    }
                    _ => Err(ConflictError::StructuralMergeUnsupported {
                        id: record.id.clone(),
                    }
                    .into()),
                }
            }
        }
    }
}
