//! Compare-and-swap, tombstone, and persistence behavior of the record
//! store.

use async_trait::async_trait;
use tessera::{
    ContentValue, Id, Version,
    store::{
        InMemory, RecordData, RecordKind, RecordStore, StoreError, VersionedRecord,
    },
};

use crate::helpers::TestCore;

fn text(s: &str) -> RecordData {
    RecordData::Content(ContentValue::Text(s.to_string()))
}

#[tokio::test]
async fn insert_starts_at_initial_and_cas_bumps_by_one() {
    let core = TestCore::new();
    let id = Id::new("field-1");

    let v0 = core
        .store
        .insert(RecordKind::Content, &id, text("hello"))
        .await
        .unwrap();
    assert_eq!(v0, Version::initial());

    let v1 = core
        .store
        .put_if_version(RecordKind::Content, &id, v0, text("hello world"))
        .await
        .unwrap();
    assert_eq!(v1, v0.next());

    let envelope = core.store.get(RecordKind::Content, &id).await.unwrap();
    assert_eq!(envelope.version, v1);
    assert_eq!(envelope.data, text("hello world"));
}

#[tokio::test]
async fn stale_write_reports_the_current_version() {
    let core = TestCore::new();
    let id = Id::new("field-1");
    let v0 = core
        .store
        .insert(RecordKind::Content, &id, text("base"))
        .await
        .unwrap();
    core.store
        .put_if_version(RecordKind::Content, &id, v0, text("first"))
        .await
        .unwrap();

    // Second writer still holds v0.
    let err = core
        .store
        .put_if_version(RecordKind::Content, &id, v0, text("second"))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());
    match err {
        tessera::Error::Store(StoreError::VersionMismatch {
            expected, current, ..
        }) => {
            assert_eq!(expected, Version::initial());
            assert_eq!(current, Version::initial().next());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The failed write changed nothing.
    let envelope = core.store.get(RecordKind::Content, &id).await.unwrap();
    assert_eq!(envelope.data, text("first"));
}

#[tokio::test]
async fn insert_rejects_taken_ids_including_tombstones() {
    let core = TestCore::new();
    let id = Id::new("field-1");
    let v0 = core
        .store
        .insert(RecordKind::Content, &id, text("a"))
        .await
        .unwrap();

    let err = core
        .store
        .insert(RecordKind::Content, &id, text("b"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tessera::Error::Store(StoreError::AlreadyExists { .. })
    ));

    core.store
        .tombstone(RecordKind::Content, &id, v0)
        .await
        .unwrap();
    let err = core
        .store
        .insert(RecordKind::Content, &id, text("b"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tessera::Error::Store(StoreError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn tombstones_stay_readable_but_unlistable_and_unwritable() {
    let core = TestCore::new();
    let id = Id::new("field-1");
    let v0 = core
        .store
        .insert(RecordKind::Content, &id, text("gone soon"))
        .await
        .unwrap();
    let v1 = core
        .store
        .tombstone(RecordKind::Content, &id, v0)
        .await
        .unwrap();
    assert_eq!(v1, v0.next());

    let envelope = core.store.get(RecordKind::Content, &id).await.unwrap();
    assert!(envelope.tombstoned);
    assert_eq!(envelope.data, text("gone soon"));

    assert!(core.store.list(RecordKind::Content).await.unwrap().is_empty());
    assert_eq!(core.store.live_count(RecordKind::Content), 0);

    let err = core
        .store
        .put_if_version(RecordKind::Content, &id, v1, text("revived"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tessera::Error::Store(StoreError::Tombstoned { .. })
    ));
}

#[tokio::test]
async fn data_kind_must_match_the_requested_kind() {
    let core = TestCore::new();
    let err = core
        .store
        .insert(RecordKind::Structure, &Id::new("x"), text("not structure"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tessera::Error::Store(StoreError::KindMismatch { .. })
    ));
}

#[tokio::test]
async fn save_and_load_round_trips_full_state() {
    let core = TestCore::new();
    let keep = Id::new("keep");
    let drop_id = Id::new("drop");
    let v0 = core
        .store
        .insert(RecordKind::Content, &keep, text("kept"))
        .await
        .unwrap();
    core.store
        .put_if_version(RecordKind::Content, &keep, v0, text("kept v1"))
        .await
        .unwrap();
    let v0 = core
        .store
        .insert(RecordKind::Content, &drop_id, text("dropped"))
        .await
        .unwrap();
    core.store
        .tombstone(RecordKind::Content, &drop_id, v0)
        .await
        .unwrap();
    core.seed_item("item-1", "page-1", "hero", 0, "alice").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    core.store.save_to_file(&path).unwrap();

    let loaded = InMemory::load_from_file(&path).unwrap();
    let envelope = loaded.get(RecordKind::Content, &keep).await.unwrap();
    assert_eq!(envelope.data, text("kept v1"));
    assert_eq!(envelope.version, Version::new(1));
    assert!(loaded.get(RecordKind::Content, &drop_id).await.unwrap().tombstoned);
    assert_eq!(loaded.live_count(RecordKind::Content), 1);
    assert_eq!(loaded.live_count(RecordKind::Structure), 1);
}

#[tokio::test]
async fn loading_a_missing_file_yields_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = InMemory::load_from_file(dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded.live_count(RecordKind::Content), 0);
}

/// Store stub that fails every call, standing in for an unreachable
/// persistence collaborator.
struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn get(&self, _kind: RecordKind, _id: &Id) -> tessera::Result<VersionedRecord> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }

    async fn insert(
        &self,
        _kind: RecordKind,
        _id: &Id,
        _data: RecordData,
    ) -> tessera::Result<Version> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }

    async fn put_if_version(
        &self,
        _kind: RecordKind,
        _id: &Id,
        _expected: Version,
        _data: RecordData,
    ) -> tessera::Result<Version> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }

    async fn tombstone(
        &self,
        _kind: RecordKind,
        _id: &Id,
        _expected: Version,
    ) -> tessera::Result<Version> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }

    async fn list(&self, _kind: RecordKind) -> tessera::Result<Vec<(Id, VersionedRecord)>> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }
}

#[tokio::test]
async fn unavailable_store_surfaces_as_retryable() {
    let store = FailingStore;
    let err = store
        .get(RecordKind::Content, &Id::new("anything"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.module(), "store");
}
