//! Ordered placement of components inside a container.
//!
//! A page (container) holds sections (sub-containers), each with an ordered
//! sequence of placed components. Order uniqueness within a
//! `(container, sub_container)` lane is a *target* invariant: concurrent
//! editors routinely produce transient collisions, which the calculator
//! resolves deterministically rather than silently tolerating.
//!
//! Everything in this module is pure and value-based; persistence and
//! notification live in [`crate::reorder`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::content::Id;

mod calculator;
mod errors;

pub use calculator::{
    calculate_new_position, calculate_optimal_position, compact_positions, resolve_position_conflict,
    validate_drop_zone,
};
pub use errors::PositionError;

/// The slot a placed component occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Page the component lives on.
    pub container_id: Id,
    /// Section within the page.
    pub sub_container_id: Id,
    /// Zero-based order within the section. Non-negative by construction.
    pub order: u32,
}

impl Position {
    pub fn new(container_id: impl Into<Id>, sub_container_id: impl Into<Id>, order: u32) -> Self {
        Self {
            container_id: container_id.into(),
            sub_container_id: sub_container_id.into(),
            order,
        }
    }

    /// The `(container, sub_container)` lane this position belongs to.
    /// Order uniqueness is scoped to a lane.
    pub fn lane(&self) -> (&Id, &Id) {
        (&self.container_id, &self.sub_container_id)
    }

    /// Same lane as `other`, ignoring order.
    pub fn same_lane(&self, other: &Position) -> bool {
        self.lane() == other.lane()
    }
}

/// A component placed inside a container.
///
/// The record's version lives on the store envelope, not here; the item
/// itself carries placement and authorship. Removed items are tombstoned in
/// the store rather than hard-deleted, to keep history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedItem {
    pub id: Id,
    /// Component kind (e.g. `"text"`, `"image"`, `"booking_widget"`).
    pub kind: String,
    pub position: Position,
    pub created_by: String,
    /// Milliseconds since Unix epoch. Collision resolution orders groups by
    /// this field.
    pub created_at: u64,
    pub last_modified_by: String,
    pub last_modified_at: u64,
}

/// Where a dragged component may land and what it accepts.
///
/// Transient: constructed per drag gesture, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropZone {
    pub id: Id,
    /// Component kinds this zone accepts. [`crate::constants::WILDCARD_KIND`]
    /// accepts every kind (deletion/trash zones).
    pub accepted_kinds: BTreeSet<String>,
    pub target_position: Position,
    pub is_active: bool,
    pub is_valid: bool,
}

/// The payload being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DragItem {
    /// A new component dragged in from the palette.
    NewItem { kind: String },
    /// An already-placed component being moved.
    ExistingItem { item_id: Id, source_position: Position },
}

/// How [`calculate_new_position`] picks the target order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Take the drop zone's order as-is; the caller shifts trailing items.
    Insert,
    /// Place after every existing item in the target lane.
    Append,
}

/// Outcome of [`validate_drop_zone`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropValidation {
    pub is_valid: bool,
    /// Stated rejection reason when invalid.
    pub reason: Option<String>,
}

impl DropValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Which side of an order collision moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStrategy {
    /// The earliest-created item keeps its order; later arrivals shift up.
    ShiftNewer,
    /// The most recently created item keeps its order; earlier items shift up.
    ShiftOlder,
}

/// An item paired with a (possibly reassigned) position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPosition {
    pub item_id: Id,
    pub position: Position,
}

/// Result of [`resolve_position_conflict`]: every item in the affected
/// container with its final, unique position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResolution {
    pub strategy: ShiftStrategy,
    pub resolved_positions: Vec<ItemPosition>,
}
