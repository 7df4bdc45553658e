//! In-memory record store implementation
//!
//! Suitable for testing, development, or scenarios where persistence is
//! handled externally by saving/loading the entire state to/from a file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::content::{Id, Version};
use crate::store::{RecordData, RecordKind, RecordStore, StoreError, VersionedRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    data: RecordData,
    version: Version,
    tombstoned: bool,
}

type RecordMap = HashMap<RecordKind, HashMap<Id, StoredRecord>>;

/// A simple in-memory record store using a `HashMap` per record kind.
///
/// Provides basic persistence via [`save_to_file`](InMemory::save_to_file)
/// and [`load_from_file`](InMemory::load_from_file), serializing the full
/// state to JSON.
#[derive(Debug, Default)]
pub struct InMemory {
    /// Records keyed by kind then ID, behind a read-write lock for
    /// concurrent access.
    records: RwLock<RecordMap>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves the entire store state to a file as JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let records = self.records.read().unwrap();
        let json = serde_json::to_string_pretty(&*records)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads store state from a JSON file.
    ///
    /// A missing file yields a new, empty store.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let records: RecordMap = serde_json::from_str(&json)?;
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    /// Number of live records of a kind. Tombstones are not counted.
    pub fn live_count(&self, kind: RecordKind) -> usize {
        let records = self.records.read().unwrap();
        records
            .get(&kind)
            .map(|m| m.values().filter(|r| !r.tombstoned).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for InMemory {
    async fn get(&self, kind: RecordKind, id: &Id) -> Result<VersionedRecord> {
        let records = self.records.read().unwrap();
        let stored = records
            .get(&kind)
            .and_then(|m| m.get(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            })?;
        Ok(VersionedRecord {
            data: stored.data.clone(),
            version: stored.version,
            tombstoned: stored.tombstoned,
        })
    }

    async fn insert(&self, kind: RecordKind, id: &Id, data: RecordData) -> Result<Version> {
        if data.kind() != kind {
            return Err(StoreError::KindMismatch {
                id: id.clone(),
                expected: kind,
                actual: data.kind(),
            }
            .into());
        }
        let mut records = self.records.write().unwrap();
        let by_id = records.entry(kind).or_default();
        if by_id.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                kind,
                id: id.clone(),
            }
            .into());
        }
        let version = Version::initial();
        by_id.insert(
            id.clone(),
            StoredRecord {
                data,
                version,
                tombstoned: false,
            },
        );
        Ok(version)
    }

    async fn put_if_version(
        &self,
        kind: RecordKind,
        id: &Id,
        expected: Version,
        data: RecordData,
    ) -> Result<Version> {
        if data.kind() != kind {
            return Err(StoreError::KindMismatch {
                id: id.clone(),
                expected: kind,
                actual: data.kind(),
            }
            .into());
        }
        let mut records = self.records.write().unwrap();
        let stored = records
            .get_mut(&kind)
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            })?;
        if stored.tombstoned {
            return Err(StoreError::Tombstoned {
                kind,
                id: id.clone(),
            }
            .into());
        }
        if stored.version != expected {
            return Err(StoreError::VersionMismatch {
                kind,
                id: id.clone(),
                expected,
                current: stored.version,
            }
            .into());
        }
        stored.data = data;
        stored.version = expected.next();
        Ok(stored.version)
    }

    async fn tombstone(&self, kind: RecordKind, id: &Id, expected: Version) -> Result<Version> {
        let mut records = self.records.write().unwrap();
        let stored = records
            .get_mut(&kind)
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            })?;
        if stored.tombstoned {
            return Err(StoreError::Tombstoned {
                kind,
                id: id.clone(),
            }
            .into());
        }
        if stored.version != expected {
            return Err(StoreError::VersionMismatch {
                kind,
                id: id.clone(),
                expected,
                current: stored.version,
            }
            .into());
        }
        stored.tombstoned = true;
        stored.version = expected.next();
        Ok(stored.version)
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<(Id, VersionedRecord)>> {
        let records = self.records.read().unwrap();
        let mut live: Vec<(Id, VersionedRecord)> = records
            .get(&kind)
            .map(|m| {
                m.iter()
                    .filter(|(_, r)| !r.tombstoned)
                    .map(|(id, r)| {
                        (
                            id.clone(),
                            VersionedRecord {
                                data: r.data.clone(),
                                version: r.version,
                                tombstoned: false,
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        // HashMap iteration order is unstable; listings sort by ID.
        live.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(live)
    }
}
