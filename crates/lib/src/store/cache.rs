//! Container-contents cache collaborator.
//!
//! The wider application leans on ad-hoc module-level caches around its
//! list-fetch endpoints; inside the core, memoized container lookups are
//! modeled instead as an explicit injected collaborator with an explicit
//! invalidate-on-write contract. The reorder coordinator invalidates the
//! affected container on every write it performs.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::content::Id;
use crate::position::PlacedItem;

/// Cache of a container's live placed items.
///
/// Purely advisory: a miss means the caller reads through to the store.
/// Implementations must never serve entries past an `invalidate` call for
/// the same container.
pub trait ContainerCache: Send + Sync {
    /// Cached items for a container, if present and valid.
    fn get(&self, container_id: &Id) -> Option<Vec<PlacedItem>>;

    /// Replaces the cached items for a container.
    fn put(&self, container_id: &Id, items: Vec<PlacedItem>);

    /// Drops the cached entry for a container.
    fn invalidate(&self, container_id: &Id);
}

/// Lock-guarded map cache; good enough for a single process.
#[derive(Debug, Default)]
pub struct InMemoryContainerCache {
    entries: RwLock<HashMap<Id, Vec<PlacedItem>>>,
}

impl InMemoryContainerCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContainerCache for InMemoryContainerCache {
    fn get(&self, container_id: &Id) -> Option<Vec<PlacedItem>> {
        self.entries.read().unwrap().get(container_id).cloned()
    }

    fn put(&self, container_id: &Id, items: Vec<PlacedItem>) {
        self.entries
            .write()
            .unwrap()
            .insert(container_id.clone(), items);
    }

    fn invalidate(&self, container_id: &Id) {
        self.entries.write().unwrap().remove(container_id);
    }
}
