//! Pure placement computations.
//!
//! All functions here are stateless and operate on plain values: computing
//! insertion orders, validating drop targets, resolving order collisions,
//! and compacting sparse order sequences. The coordinator in
//! [`crate::reorder`] is responsible for persisting whatever these compute.

use std::collections::{BTreeMap, HashSet};

use crate::constants::WILDCARD_KIND;
use crate::content::Id;
use crate::{Result, position::errors::PositionError};

use super::{
    DragItem, DropValidation, DropZone, InsertMode, ItemPosition, PlacedItem, Position,
    PositionResolution, ShiftStrategy,
};

/// Computes the position a dropped component should take.
///
/// `Insert` returns the drop zone's target order unchanged; shifting the
/// items at or after that order is the caller's job (see
/// [`crate::reorder::ReorderCoordinator::place`]). `Append` returns one past
/// the highest order in the target lane, or `0` when the lane is empty.
///
/// Drop-zone activity/validity is deliberately not checked here; that is
/// [`validate_drop_zone`]'s job, called earlier in the pipeline.
pub fn calculate_new_position(
    existing_items: &[PlacedItem],
    drop_zone: &DropZone,
    mode: InsertMode,
) -> Position {
    let target = &drop_zone.target_position;
    match mode {
        InsertMode::Insert => target.clone(),
        InsertMode::Append => {
            let next_order = existing_items
                .iter()
                .filter(|item| item.position.same_lane(target))
                .map(|item| item.position.order)
                .max()
                .map(|max| max + 1)
                .unwrap_or(0);
            Position::new(
                target.container_id.clone(),
                target.sub_container_id.clone(),
                next_order,
            )
        }
    }
}

/// Validates a drag payload against a drop zone.
///
/// Rejections are reported in priority order: inactive zone, then kind
/// incompatibility, then a no-op drop of an existing item onto its own
/// current position. The wildcard kind `"*"` accepts every component.
pub fn validate_drop_zone(
    drag_item: &DragItem,
    drop_zone: &DropZone,
    existing_kind: Option<&str>,
) -> DropValidation {
    if !drop_zone.is_active {
        return DropValidation::invalid("Drop zone is not active");
    }

    let dragged_kind = match drag_item {
        DragItem::NewItem { kind } => Some(kind.as_str()),
        DragItem::ExistingItem { .. } => existing_kind,
    };
    if let Some(kind) = dragged_kind
        && !drop_zone.accepted_kinds.contains(kind)
        && !drop_zone.accepted_kinds.contains(WILDCARD_KIND)
    {
        return DropValidation::invalid(format!("Drop zone does not accept kind '{kind}'"));
    }

    if let DragItem::ExistingItem {
        source_position, ..
    } = drag_item
        && *source_position == drop_zone.target_position
    {
        return DropValidation::invalid("Cannot drop on current position");
    }

    DropValidation::valid()
}

/// Finds the nearest free order at or above `preferred`.
///
/// A free `preferred` is returned unchanged; this is how gaps in a sparse
/// sequence get filled without a full compaction. An occupied `preferred`
/// probes strictly upward, never downward, so earlier content is never
/// silently displaced. Negative input normalizes to `0` and is returned
/// as-is (a front placement request; the resulting duplicate, if any, goes
/// through collision resolution rather than probing).
pub fn calculate_optimal_position(existing_orders: &[u32], preferred: i64) -> u32 {
    if preferred < 0 {
        return 0;
    }
    let occupied: HashSet<u32> = existing_orders.iter().copied().collect();
    // Out-of-range requests pin to the end rather than wrapping around.
    let mut candidate = u32::try_from(preferred).unwrap_or(u32::MAX);
    while occupied.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Resolves order collisions among the items of one container.
///
/// Items sharing an identical `(container, sub_container, order)` form a
/// collision group. Within a group the keeper is chosen by creation time
/// (`ShiftNewer`: earliest keeps; `ShiftOlder`: most recent keeps) and every
/// displaced item is reassigned upward from the contested order, cascading
/// past any further occupied slot until it finds a free one. Settled items
/// never move again, so each originally-conflicting item is placed in a
/// single pass.
///
/// The result lists **every** input item, including the ones whose position
/// did not change, each with its final, lane-unique position.
pub fn resolve_position_conflict(
    items: &[PlacedItem],
    strategy: ShiftStrategy,
) -> Result<PositionResolution> {
    if let Some(first) = items.first() {
        for item in items {
            if item.position.container_id != first.position.container_id {
                return Err(PositionError::MixedContainers {
                    expected: first.position.container_id.clone(),
                    found: item.position.container_id.clone(),
                }
                .into());
            }
        }
    }

    // Final order per input index, filled lane by lane.
    let mut final_orders: Vec<u32> = items.iter().map(|i| i.position.order).collect();

    let mut lanes: BTreeMap<&Id, Vec<usize>> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        lanes
            .entry(&item.position.sub_container_id)
            .or_default()
            .push(idx);
    }

    for indices in lanes.values() {
        resolve_lane(items, indices, strategy, &mut final_orders);
    }

    let resolved_positions = items
        .iter()
        .enumerate()
        .map(|(idx, item)| ItemPosition {
            item_id: item.id.clone(),
            position: Position::new(
                item.position.container_id.clone(),
                item.position.sub_container_id.clone(),
                final_orders[idx],
            ),
        })
        .collect();

    Ok(PositionResolution {
        strategy,
        resolved_positions,
    })
}

/// Resolves one `(container, sub_container)` lane in place.
fn resolve_lane(
    items: &[PlacedItem],
    indices: &[usize],
    strategy: ShiftStrategy,
    final_orders: &mut [u32],
) {
    // Collision groups keyed by the contested order.
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for &idx in indices {
        groups.entry(items[idx].position.order).or_default().push(idx);
    }

    let mut occupied: HashSet<u32> = HashSet::new();
    // (contested order, displaced indices in shift sequence)
    let mut displaced: Vec<(u32, Vec<usize>)> = Vec::new();

    for (&order, members) in &groups {
        if members.len() == 1 {
            occupied.insert(order);
            continue;
        }
        // Creation order decides the keeper; ties fall back to input order,
        // which callers pre-sort when stability across equal timestamps
        // matters.
        let mut by_creation = members.clone();
        by_creation.sort_by_key(|&idx| (items[idx].created_at, idx));
        let movers = match strategy {
            // Earliest created keeps; later arrivals shift in creation order.
            ShiftStrategy::ShiftNewer => by_creation.split_off(1),
            // Most recent keeps; earlier items shift in reverse creation order.
            ShiftStrategy::ShiftOlder => {
                by_creation.reverse();
                by_creation.split_off(1)
            }
        };
        occupied.insert(order);
        displaced.push((order, movers));
    }

    // Shift displaced items upward from the contested order, probing past
    // every occupied slot. Slots vacated by other displaced items are free.
    for (order, movers) in displaced {
        for (rank, idx) in movers.into_iter().enumerate() {
            let mut candidate = order + rank as u32 + 1;
            while occupied.contains(&candidate) {
                candidate += 1;
            }
            occupied.insert(candidate);
            final_orders[idx] = candidate;
        }
    }
}

/// Renumbers a sparse order sequence to a dense `0..n` sequence.
///
/// Pure re-indexing: items never reorder relative to each other. Sorting by
/// original order is stable, so ties keep their input order (callers
/// pre-sort by creation time when that matters). Compacting an
/// already-compact sequence is a no-op.
pub fn compact_positions(positions: &[ItemPosition]) -> Vec<ItemPosition> {
    // Lanes compact independently; lane grouping preserves first-seen order.
    let mut lane_order: Vec<(&Id, &Id)> = Vec::new();
    let mut lanes: BTreeMap<(&Id, &Id), Vec<&ItemPosition>> = BTreeMap::new();
    for entry in positions {
        let lane = entry.position.lane();
        if !lanes.contains_key(&lane) {
            lane_order.push(lane);
        }
        lanes.entry(lane).or_default().push(entry);
    }

    let mut compacted = Vec::with_capacity(positions.len());
    for lane in lane_order {
        let mut entries = lanes.remove(&lane).unwrap_or_default();
        entries.sort_by_key(|e| e.position.order);
        for (order, entry) in entries.into_iter().enumerate() {
            compacted.push(ItemPosition {
                item_id: entry.item_id.clone(),
                position: Position::new(
                    entry.position.container_id.clone(),
                    entry.position.sub_container_id.clone(),
                    order as u32,
                ),
            });
        }
    }
    compacted
}
