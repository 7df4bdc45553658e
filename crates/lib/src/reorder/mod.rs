//! Batch position mutations against the record store.
//!
//! The [`ReorderCoordinator`] orchestrates what the pure calculator in
//! [`crate::position`] computes: it validates a batch up front, applies each
//! operation as an individual compare-and-swap write, resolves any order
//! collisions the batch produced, and emits one batched change notification.
//!
//! The batch is atomic only from the caller's validation point of view: a
//! stale-version failure on one item does **not** roll back operations
//! already applied. The report lists which operations succeeded and which
//! failed so the caller retries the failed subset. Listeners notified of the
//! applied subset stay consistent with the store either way.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::Clock;
use crate::content::{Id, Version};
use crate::events::{Broadcaster, Event, EventKind, publish_best_effort};
use crate::position::{
    DragItem, DropZone, InsertMode, ItemPosition, PlacedItem, Position, ShiftStrategy,
    calculate_new_position, compact_positions, resolve_position_conflict, validate_drop_zone,
};
use crate::store::{ContainerCache, RecordData, RecordKind, RecordStore, StoreError};
use crate::{Error, Result};

mod errors;

pub use errors::ReorderError;

/// One requested position mutation.
///
/// `new_order` arrives as a signed integer because the web layer cannot be
/// trusted to pre-validate; negatives and values past `u32::MAX` are
/// rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOp {
    pub item_id: Id,
    pub new_order: i64,
    /// Move to a different page, keeping the current one when absent.
    pub new_container_id: Option<Id>,
    /// Move to a different section, keeping the current one when absent.
    pub new_sub_container_id: Option<Id>,
}

/// An operation that could not be applied.
///
/// These are compare-and-swap outcomes, not validation failures: the item
/// moved (or vanished) under the caller, whose next attempt goes through the
/// conflict detect/resolve path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedOp {
    pub item_id: Id,
    pub reason: String,
}

/// Outcome of a reorder batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderReport {
    /// Items whose writes succeeded, with their final positions (after
    /// collision resolution when the whole batch applied).
    pub applied: Vec<PlacedItem>,
    /// Operations that failed their versioned write, for the caller to
    /// retry.
    pub failed: Vec<FailedOp>,
}

impl ReorderReport {
    /// True when every operation in the batch was applied.
    pub fn fully_applied(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates position mutations: validate, write, resolve collisions,
/// notify.
///
/// Holds no locks and keeps no state of its own; concurrency safety comes
/// entirely from the store's compare-and-swap discipline. Container listings
/// are memoized through the injected [`ContainerCache`], invalidated on
/// every write this coordinator performs.
pub struct ReorderCoordinator {
    store: Arc<dyn RecordStore>,
    broadcaster: Arc<dyn Broadcaster>,
    cache: Arc<dyn ContainerCache>,
    clock: Arc<dyn Clock>,
}

impl ReorderCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        broadcaster: Arc<dyn Broadcaster>,
        cache: Arc<dyn ContainerCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            cache,
            clock,
        }
    }

    /// Live placed items of a container, served from the cache when warm.
    pub async fn container_items(&self, container_id: &Id) -> Result<Vec<PlacedItem>> {
        if let Some(items) = self.cache.get(container_id) {
            return Ok(items);
        }
        let items: Vec<PlacedItem> = self
            .structure_entries(container_id)
            .await?
            .into_iter()
            .map(|(item, _)| item)
            .collect();
        self.cache.put(container_id, items.clone());
        Ok(items)
    }

    /// Applies a batch of reorder operations.
    ///
    /// Every operation is validated before any store access; the first
    /// malformed one aborts the whole batch with no partial writes. Writes
    /// then apply in caller order, each an individual versioned write. Once
    /// every write has succeeded, collisions in the affected containers are
    /// resolved (shifting newer items) and exactly one `reorder_applied`
    /// event is published listing every affected item.
    pub async fn reorder(&self, operations: &[ReorderOp], actor_id: &str) -> Result<ReorderReport> {
        for (index, op) in operations.iter().enumerate() {
            if op.item_id.is_empty() {
                return Err(ReorderError::InvalidOperation {
                    index,
                    reason: "missing item id".to_string(),
                }
                .into());
            }
            if op.new_order < 0 {
                return Err(ReorderError::InvalidOperation {
                    index,
                    reason: format!("negative order {}", op.new_order),
                }
                .into());
            }
            if op.new_order > i64::from(u32::MAX) {
                return Err(ReorderError::InvalidOperation {
                    index,
                    reason: format!("order {} exceeds the maximum", op.new_order),
                }
                .into());
            }
        }

        let mut applied: Vec<PlacedItem> = Vec::new();
        let mut failed: Vec<FailedOp> = Vec::new();
        let mut affected: BTreeSet<Id> = BTreeSet::new();

        for op in operations {
            match self.apply_operation(op, actor_id).await {
                Ok((previous_container, item)) => {
                    affected.insert(previous_container);
                    affected.insert(item.position.container_id.clone());
                    self.cache.invalidate(&item.position.container_id);
                    applied.push(item);
                }
                Err(PerOpFailure::Reported(failure)) => {
                    tracing::debug!(item = %failure.item_id, reason = %failure.reason,
                        "reorder operation not applied");
                    failed.push(failure);
                }
                Err(PerOpFailure::Fatal(err)) => return Err(err),
            }
        }
        for container in &affected {
            self.cache.invalidate(container);
        }

        if !failed.is_empty() {
            // Partial batch: no collision resolution and no notification;
            // the caller retries the failed subset first.
            return Ok(ReorderReport { applied, failed });
        }

        let mut final_positions: HashMap<Id, Position> = HashMap::new();
        let mut displaced: Vec<ItemPosition> = Vec::new();
        for container in &affected {
            let (resolved, moved) = self.resolve_collisions(container, actor_id).await?;
            for entry in resolved {
                final_positions.insert(entry.item_id, entry.position);
            }
            displaced.extend(moved);
        }
        for item in &mut applied {
            if let Some(position) = final_positions.get(&item.id) {
                item.position = position.clone();
            }
        }

        if let Some(container_id) = applied.first().map(|i| i.position.container_id.clone()) {
            // Every affected item: the batch's own plus any bystander the
            // collision pass displaced.
            let batch_ids: BTreeSet<Id> = applied.iter().map(|i| i.id.clone()).collect();
            let mut items: Vec<ItemPosition> = applied
                .iter()
                .map(|item| ItemPosition {
                    item_id: item.id.clone(),
                    position: item.position.clone(),
                })
                .collect();
            items.extend(
                displaced
                    .into_iter()
                    .filter(|entry| !batch_ids.contains(&entry.item_id)),
            );
            publish_best_effort(
                self.broadcaster.as_ref(),
                Event {
                    id: Id::generate(),
                    kind: EventKind::ReorderApplied,
                    container_id,
                    actor_id: actor_id.to_string(),
                    timestamp: self.clock.now_rfc3339(),
                    payload: json!({ "items": items }),
                },
            );
        }

        Ok(ReorderReport { applied, failed })
    }

    /// Places a dragged component: validates the drop, computes the target
    /// position, shifts trailing items for an insert, and writes the item.
    ///
    /// Publishes one `structure_updated` event for the target container.
    pub async fn place(
        &self,
        drag_item: &DragItem,
        drop_zone: &DropZone,
        mode: InsertMode,
        actor_id: &str,
    ) -> Result<PlacedItem> {
        let existing_kind = match drag_item {
            DragItem::NewItem { .. } => None,
            DragItem::ExistingItem { item_id, .. } => {
                let (item, _) = self.structure_entry(item_id).await?;
                Some(item.kind)
            }
        };
        let validation = validate_drop_zone(drag_item, drop_zone, existing_kind.as_deref());
        if !validation.is_valid {
            return Err(ReorderError::InvalidDrop {
                reason: validation
                    .reason
                    .unwrap_or_else(|| "drop rejected".to_string()),
            }
            .into());
        }

        let container_id = drop_zone.target_position.container_id.clone();
        let entries = self.structure_entries(&container_id).await?;
        let items: Vec<PlacedItem> = entries.iter().map(|(item, _)| item.clone()).collect();
        let position = calculate_new_position(&items, drop_zone, mode);

        if mode == InsertMode::Insert {
            let moving_id = match drag_item {
                DragItem::ExistingItem { item_id, .. } => Some(item_id),
                DragItem::NewItem { .. } => None,
            };
            self.shift_from(&entries, &position, moving_id, actor_id)
                .await?;
        }

        let now = self.clock.now_millis();
        let placed = match drag_item {
            DragItem::NewItem { kind } => {
                let item = PlacedItem {
                    id: Id::generate(),
                    kind: kind.clone(),
                    position: position.clone(),
                    created_by: actor_id.to_string(),
                    created_at: now,
                    last_modified_by: actor_id.to_string(),
                    last_modified_at: now,
                };
                self.store
                    .insert(
                        RecordKind::Structure,
                        &item.id,
                        RecordData::Structure(item.clone()),
                    )
                    .await?;
                item
            }
            DragItem::ExistingItem { item_id, .. } => {
                let (mut item, version) = self.structure_entry(item_id).await?;
                let previous_container = item.position.container_id.clone();
                item.position = position.clone();
                item.last_modified_by = actor_id.to_string();
                item.last_modified_at = now;
                self.store
                    .put_if_version(
                        RecordKind::Structure,
                        item_id,
                        version,
                        RecordData::Structure(item.clone()),
                    )
                    .await?;
                self.cache.invalidate(&previous_container);
                item
            }
        };
        self.cache.invalidate(&container_id);

        publish_best_effort(
            self.broadcaster.as_ref(),
            Event {
                id: Id::generate(),
                kind: EventKind::StructureUpdated,
                container_id,
                actor_id: actor_id.to_string(),
                timestamp: self.clock.now_rfc3339(),
                payload: json!({ "itemId": placed.id, "position": placed.position }),
            },
        );
        Ok(placed)
    }

    /// Tombstones a placed item, keeping its history in the store.
    pub async fn remove(&self, item_id: &Id, actor_id: &str) -> Result<()> {
        let (item, version) = self.structure_entry(item_id).await?;
        self.store
            .tombstone(RecordKind::Structure, item_id, version)
            .await?;
        let container_id = item.position.container_id.clone();
        self.cache.invalidate(&container_id);

        publish_best_effort(
            self.broadcaster.as_ref(),
            Event {
                id: Id::generate(),
                kind: EventKind::StructureUpdated,
                container_id,
                actor_id: actor_id.to_string(),
                timestamp: self.clock.now_rfc3339(),
                payload: json!({ "itemId": item_id, "removed": true }),
            },
        );
        Ok(())
    }

    /// Compacts one `(container, sub_container)` lane to a dense `0..n`
    /// order sequence, publishing one `reorder_applied` event when anything
    /// moved.
    pub async fn compact(
        &self,
        container_id: &Id,
        sub_container_id: &Id,
        actor_id: &str,
    ) -> Result<Vec<PlacedItem>> {
        let mut entries: Vec<(PlacedItem, Version)> = self
            .structure_entries(container_id)
            .await?
            .into_iter()
            .filter(|(item, _)| item.position.sub_container_id == *sub_container_id)
            .collect();
        // Pre-sort so equal orders stay stable across creation time.
        entries.sort_by_key(|(item, _)| (item.position.order, item.created_at));

        let positions: Vec<ItemPosition> = entries
            .iter()
            .map(|(item, _)| ItemPosition {
                item_id: item.id.clone(),
                position: item.position.clone(),
            })
            .collect();
        let compacted = compact_positions(&positions);

        let mut result = Vec::with_capacity(entries.len());
        let mut moved = Vec::new();
        for ((mut item, version), target) in entries.into_iter().zip(compacted) {
            if item.position != target.position {
                item.position = target.position.clone();
                item.last_modified_by = actor_id.to_string();
                item.last_modified_at = self.clock.now_millis();
                self.store
                    .put_if_version(
                        RecordKind::Structure,
                        &item.id,
                        version,
                        RecordData::Structure(item.clone()),
                    )
                    .await?;
                moved.push(target);
            }
            result.push(item);
        }
        self.cache.invalidate(container_id);

        if !moved.is_empty() {
            publish_best_effort(
                self.broadcaster.as_ref(),
                Event {
                    id: Id::generate(),
                    kind: EventKind::ReorderApplied,
                    container_id: container_id.clone(),
                    actor_id: actor_id.to_string(),
                    timestamp: self.clock.now_rfc3339(),
                    payload: json!({ "items": moved }),
                },
            );
        }
        Ok(result)
    }

    /// Applies one operation as a read-then-CAS write.
    ///
    /// Returns the previous container (for cache invalidation) and the
    /// written item.
    async fn apply_operation(
        &self,
        op: &ReorderOp,
        actor_id: &str,
    ) -> std::result::Result<(Id, PlacedItem), PerOpFailure> {
        let envelope = self
            .store
            .get(RecordKind::Structure, &op.item_id)
            .await
            .map_err(|e| PerOpFailure::classify(&op.item_id, e))?;
        if envelope.tombstoned {
            return Err(PerOpFailure::Reported(FailedOp {
                item_id: op.item_id.clone(),
                reason: "item was removed".to_string(),
            }));
        }
        let RecordData::Structure(mut item) = envelope.data else {
            return Err(PerOpFailure::Fatal(
                StoreError::KindMismatch {
                    id: op.item_id.clone(),
                    expected: RecordKind::Structure,
                    actual: RecordKind::Content,
                }
                .into(),
            ));
        };

        let previous_container = item.position.container_id.clone();
        if let Some(container) = &op.new_container_id {
            item.position.container_id = container.clone();
        }
        if let Some(sub) = &op.new_sub_container_id {
            item.position.sub_container_id = sub.clone();
        }
        item.position.order = op.new_order as u32;
        item.last_modified_by = actor_id.to_string();
        item.last_modified_at = self.clock.now_millis();

        self.store
            .put_if_version(
                RecordKind::Structure,
                &op.item_id,
                envelope.version,
                RecordData::Structure(item.clone()),
            )
            .await
            .map_err(|e| PerOpFailure::classify(&op.item_id, e))?;
        Ok((previous_container, item))
    }

    /// Restores order uniqueness in one container after a batch, writing
    /// every item whose position changed.
    ///
    /// Returns every item's final position plus the subset that actually
    /// moved, so displaced bystanders can be announced alongside the batch.
    async fn resolve_collisions(
        &self,
        container_id: &Id,
        actor_id: &str,
    ) -> Result<(Vec<ItemPosition>, Vec<ItemPosition>)> {
        let entries = self.structure_entries(container_id).await?;
        let items: Vec<PlacedItem> = entries.iter().map(|(item, _)| item.clone()).collect();
        let resolution = resolve_position_conflict(&items, ShiftStrategy::ShiftNewer)?;

        let mut moved = Vec::new();
        for (resolved, (mut item, version)) in resolution
            .resolved_positions
            .iter()
            .zip(entries.into_iter())
        {
            if item.position != resolved.position {
                item.position = resolved.position.clone();
                item.last_modified_by = actor_id.to_string();
                item.last_modified_at = self.clock.now_millis();
                self.store
                    .put_if_version(
                        RecordKind::Structure,
                        &item.id,
                        version,
                        RecordData::Structure(item.clone()),
                    )
                    .await?;
                moved.push(resolved.clone());
            }
        }
        self.cache.invalidate(container_id);
        Ok((resolution.resolved_positions, moved))
    }

    /// Shifts every item in the target lane at or after `position` up by
    /// one, clearing the slot an insert is about to take.
    async fn shift_from(
        &self,
        entries: &[(PlacedItem, Version)],
        position: &Position,
        exclude: Option<&Id>,
        actor_id: &str,
    ) -> Result<()> {
        let mut to_shift: Vec<(PlacedItem, Version)> = entries
            .iter()
            .filter(|(item, _)| {
                item.position.same_lane(position)
                    && item.position.order >= position.order
                    && exclude.is_none_or(|id| item.id != *id)
            })
            .cloned()
            .collect();
        // Highest order first, so no transient collision is ever written.
        to_shift.sort_by(|a, b| b.0.position.order.cmp(&a.0.position.order));

        for (mut item, version) in to_shift {
            item.position.order += 1;
            item.last_modified_by = actor_id.to_string();
            item.last_modified_at = self.clock.now_millis();
            self.store
                .put_if_version(
                    RecordKind::Structure,
                    &item.id,
                    version,
                    RecordData::Structure(item.clone()),
                )
                .await?;
        }
        Ok(())
    }

    /// All live structure records of a container, with their versions.
    async fn structure_entries(&self, container_id: &Id) -> Result<Vec<(PlacedItem, Version)>> {
        Ok(self
            .store
            .list(RecordKind::Structure)
            .await?
            .into_iter()
            .filter_map(|(_, envelope)| match envelope.data {
                RecordData::Structure(item) if item.position.container_id == *container_id => {
                    Some((item, envelope.version))
                }
                _ => None,
            })
            .collect())
    }

    /// One live structure record, mapping store not-found to `ItemNotFound`.
    async fn structure_entry(&self, item_id: &Id) -> Result<(PlacedItem, Version)> {
        let envelope = match self.store.get(RecordKind::Structure, item_id).await {
            Ok(envelope) => envelope,
            Err(Error::Store(StoreError::RecordNotFound { .. })) => {
                return Err(ReorderError::ItemNotFound {
                    id: item_id.clone(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };
        if envelope.tombstoned {
            return Err(ReorderError::ItemNotFound {
                id: item_id.clone(),
            }
            .into());
        }
        match envelope.data {
            RecordData::Structure(item) => Ok((item, envelope.version)),
            _ => Err(ReorderError::ItemNotFound {
                id: item_id.clone(),
            }
            .into()),
        }
    }
}

/// Distinguishes per-operation failures (reported in the batch report) from
/// failures that abort the batch.
enum PerOpFailure {
    Reported(FailedOp),
    Fatal(Error),
}

impl PerOpFailure {
    fn classify(item_id: &Id, err: Error) -> Self {
        match &err {
            Error::Store(e)
                if e.is_not_found() || e.is_version_mismatch() || e.is_tombstoned() =>
            {
                PerOpFailure::Reported(FailedOp {
                    item_id: item_id.clone(),
                    reason: err.to_string(),
                })
            }
            _ => PerOpFailure::Fatal(err),
        }
    }
}
