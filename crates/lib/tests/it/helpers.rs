//! Shared fixtures and factories for the integration suite.

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera::{
    Clock, ContentValue, FixedClock, Id, Version,
    conflict::ConflictResolver,
    events::MemoryBroadcaster,
    position::{DropZone, PlacedItem, Position},
    reorder::ReorderCoordinator,
    store::{InMemory, InMemoryContainerCache, RecordData, RecordKind, RecordStore},
};

/// A fixed, readable origin for test timestamps (2023-11-14T22:13:20Z).
pub const CLOCK_ORIGIN_MILLIS: u64 = 1_700_000_000_000;

/// Everything a test needs wired together: one store, one recording
/// broadcaster, one deterministic clock, one cache.
pub struct TestCore {
    pub store: Arc<InMemory>,
    pub broadcaster: Arc<MemoryBroadcaster>,
    pub clock: Arc<FixedClock>,
    pub cache: Arc<InMemoryContainerCache>,
}

impl TestCore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            broadcaster: Arc::new(MemoryBroadcaster::new()),
            clock: Arc::new(FixedClock::new(CLOCK_ORIGIN_MILLIS)),
            cache: Arc::new(InMemoryContainerCache::new()),
        }
    }

    pub fn resolver(&self) -> ConflictResolver {
        ConflictResolver::new(
            self.store.clone(),
            self.broadcaster.clone(),
            self.clock.clone(),
        )
    }

    pub fn coordinator(&self) -> ReorderCoordinator {
        ReorderCoordinator::new(
            self.store.clone(),
            self.broadcaster.clone(),
            self.cache.clone(),
            self.clock.clone(),
        )
    }

    /// Inserts a text content record and returns its initial version.
    pub async fn seed_text(&self, id: &str, text: &str) -> Version {
        self.store
            .insert(
                RecordKind::Content,
                &Id::new(id),
                RecordData::Content(ContentValue::Text(text.to_string())),
            )
            .await
            .unwrap()
    }

    /// Inserts a placed item and returns it with its initial version.
    pub async fn seed_item(
        &self,
        id: &str,
        container: &str,
        sub: &str,
        order: u32,
        author: &str,
    ) -> (PlacedItem, Version) {
        let now = self.clock.now_millis();
        let item = PlacedItem {
            id: Id::new(id),
            kind: "text".to_string(),
            position: Position::new(container, sub, order),
            created_by: author.to_string(),
            created_at: now,
            last_modified_by: author.to_string(),
            last_modified_at: now,
        };
        let version = self
            .store
            .insert(
                RecordKind::Structure,
                &item.id,
                RecordData::Structure(item.clone()),
            )
            .await
            .unwrap();
        (item, version)
    }
}

/// A drop zone accepting the given kinds at the given slot.
pub fn drop_zone(container: &str, sub: &str, order: u32, kinds: &[&str]) -> DropZone {
    DropZone {
        id: Id::generate(),
        accepted_kinds: kinds.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
        target_position: Position::new(container, sub, order),
        is_active: true,
        is_valid: true,
    }
}
