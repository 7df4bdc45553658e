//! Batch reorder coordination: validation, partial failure reporting,
//! collision resolution, placement, removal, and compaction.

use tessera::{
    Id, Version,
    events::EventKind,
    position::{DragItem, InsertMode},
    reorder::ReorderOp,
    store::{ContainerCache, RecordData, RecordKind, RecordStore},
};

use crate::helpers::{TestCore, drop_zone};

fn op(item_id: &str, new_order: i64) -> ReorderOp {
    ReorderOp {
        item_id: Id::new(item_id),
        new_order,
        new_container_id: None,
        new_sub_container_id: None,
    }
}

#[tokio::test]
async fn batch_applies_resolves_collisions_and_emits_one_event() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.seed_item("b", "page-1", "hero", 1, "alice").await;
    core.seed_item("c", "page-1", "hero", 2, "alice").await;

    // Move c onto b's slot; the collision resolves by shifting the
    // newer of the two.
    let report = coordinator.reorder(&[op("c", 1)], "alice").await.unwrap();
    assert!(report.fully_applied());
    assert_eq!(report.applied.len(), 1);

    let items = coordinator.container_items(&Id::new("page-1")).await.unwrap();
    let order_of = |id: &str| {
        items
            .iter()
            .find(|i| i.id.as_str() == id)
            .unwrap()
            .position
            .order
    };
    // b was created before c, so b keeps order 1 and c cascades to 2.
    assert_eq!(order_of("a"), 0);
    assert_eq!(order_of("b"), 1);
    assert_eq!(order_of("c"), 2);
    let unique: std::collections::HashSet<u32> =
        items.iter().map(|i| i.position.order).collect();
    assert_eq!(unique.len(), 3);

    assert_eq!(
        core.broadcaster
            .events_of_kind(EventKind::ReorderApplied)
            .len(),
        1
    );
}

#[tokio::test]
async fn negative_order_aborts_the_whole_batch_before_any_write() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (_, v_a) = core.seed_item("a", "page-1", "hero", 0, "alice").await;

    let err = coordinator
        .reorder(&[op("a", 5), op("b", -1)], "alice")
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // The valid first operation was not applied either.
    let envelope = core
        .store
        .get(RecordKind::Structure, &Id::new("a"))
        .await
        .unwrap();
    assert_eq!(envelope.version, v_a);
    assert!(core.broadcaster.events().is_empty());
}

#[tokio::test]
async fn orders_past_u32_range_are_rejected_before_any_write() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (_, v_a) = core.seed_item("a", "page-1", "hero", 0, "alice").await;

    // 4_294_967_296 is one past u32::MAX; it must not wrap to order 0.
    let err = coordinator
        .reorder(&[op("a", 4_294_967_296)], "alice")
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("exceeds the maximum"));

    let envelope = core
        .store
        .get(RecordKind::Structure, &Id::new("a"))
        .await
        .unwrap();
    assert_eq!(envelope.version, v_a);
    let RecordData::Structure(item) = envelope.data else {
        panic!("expected structure data");
    };
    assert_eq!(item.position.order, 0);
    assert!(core.broadcaster.events().is_empty());
}

#[tokio::test]
async fn displaced_bystanders_are_announced_in_the_batch_event() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.clock.advance(1_000);
    core.seed_item("b", "page-1", "hero", 1, "alice").await;

    // a is older, so it keeps the contested slot and b cascades to 2
    // even though b was never part of the batch.
    let report = coordinator.reorder(&[op("a", 1)], "alice").await.unwrap();
    assert!(report.fully_applied());

    let events = core.broadcaster.events_of_kind(EventKind::ReorderApplied);
    assert_eq!(events.len(), 1);
    let items = events[0].payload["items"].as_array().unwrap();
    let order_in_payload = |id: &str| {
        items
            .iter()
            .find(|entry| entry["itemId"] == id)
            .unwrap_or_else(|| panic!("{id} missing from the event payload"))["position"]["order"]
            .as_u64()
            .unwrap()
    };
    assert_eq!(items.len(), 2);
    assert_eq!(order_in_payload("a"), 1);
    assert_eq!(order_in_payload("b"), 2);
}

#[tokio::test]
async fn missing_items_are_reported_not_fatal_and_no_event_fires() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;

    let report = coordinator
        .reorder(&[op("a", 3), op("ghost", 1)], "alice")
        .await
        .unwrap();
    assert!(!report.fully_applied());
    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item_id, Id::new("ghost"));

    // a's write stuck, but a partial batch publishes nothing.
    let envelope = core
        .store
        .get(RecordKind::Structure, &Id::new("a"))
        .await
        .unwrap();
    let RecordData::Structure(item) = envelope.data else {
        panic!("expected structure data");
    };
    assert_eq!(item.position.order, 3);
    assert!(core.broadcaster.events().is_empty());
}

#[tokio::test]
async fn cross_container_moves_invalidate_both_caches() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.seed_item("b", "page-2", "hero", 0, "alice").await;

    // Warm both container caches.
    assert_eq!(
        coordinator.container_items(&Id::new("page-1")).await.unwrap().len(),
        1
    );
    assert_eq!(
        coordinator.container_items(&Id::new("page-2")).await.unwrap().len(),
        1
    );

    let report = coordinator
        .reorder(
            &[ReorderOp {
                item_id: Id::new("a"),
                new_order: 5,
                new_container_id: Some(Id::new("page-2")),
                new_sub_container_id: None,
            }],
            "alice",
        )
        .await
        .unwrap();
    assert!(report.fully_applied());

    // Neither container serves stale entries.
    assert!(core.cache.get(&Id::new("page-1")).is_none());
    assert!(core.cache.get(&Id::new("page-2")).is_none());
    assert!(coordinator.container_items(&Id::new("page-1")).await.unwrap().is_empty());
    assert_eq!(
        coordinator.container_items(&Id::new("page-2")).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn placing_a_new_item_shifts_the_tail_of_the_lane() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.seed_item("b", "page-1", "hero", 1, "alice").await;

    let zone = drop_zone("page-1", "hero", 0, &["text"]);
    let placed = coordinator
        .place(
            &DragItem::NewItem {
                kind: "text".to_string(),
            },
            &zone,
            InsertMode::Insert,
            "bob",
        )
        .await
        .unwrap();
    assert_eq!(placed.position.order, 0);
    assert_eq!(placed.created_by, "bob");

    let items = coordinator.container_items(&Id::new("page-1")).await.unwrap();
    let order_of = |id: &str| {
        items
            .iter()
            .find(|i| i.id.as_str() == id)
            .unwrap()
            .position
            .order
    };
    assert_eq!(order_of("a"), 1);
    assert_eq!(order_of("b"), 2);
    assert_eq!(
        core.broadcaster
            .events_of_kind(EventKind::StructureUpdated)
            .len(),
        1
    );
}

#[tokio::test]
async fn append_places_after_the_lane_tail() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.seed_item("b", "page-1", "footer", 7, "alice").await;

    let zone = drop_zone("page-1", "hero", 0, &["text"]);
    let placed = coordinator
        .place(
            &DragItem::NewItem {
                kind: "text".to_string(),
            },
            &zone,
            InsertMode::Append,
            "bob",
        )
        .await
        .unwrap();
    // The footer lane's order 7 does not leak into the hero lane.
    assert_eq!(placed.position.order, 1);
}

#[tokio::test]
async fn rejected_drops_surface_the_validation_reason() {
    let core = TestCore::new();
    let coordinator = core.coordinator();

    let zone = drop_zone("page-1", "hero", 0, &["image"]);
    let err = coordinator
        .place(
            &DragItem::NewItem {
                kind: "text".to_string(),
            },
            &zone,
            InsertMode::Insert,
            "bob",
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("does not accept kind 'text'"));
    assert!(core.broadcaster.events().is_empty());
}

#[tokio::test]
async fn moving_an_existing_item_does_not_shift_itself() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (item, _) = core.seed_item("a", "page-1", "hero", 2, "alice").await;
    core.seed_item("b", "page-1", "hero", 3, "alice").await;

    let zone = drop_zone("page-1", "hero", 3, &["text"]);
    let placed = coordinator
        .place(
            &DragItem::ExistingItem {
                item_id: item.id.clone(),
                source_position: item.position.clone(),
            },
            &zone,
            InsertMode::Insert,
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(placed.position.order, 3);

    let items = coordinator.container_items(&Id::new("page-1")).await.unwrap();
    let order_of = |id: &str| {
        items
            .iter()
            .find(|i| i.id.as_str() == id)
            .unwrap()
            .position
            .order
    };
    // b shifted out of the contested slot; a took it.
    assert_eq!(order_of("b"), 4);
    assert_eq!(order_of("a"), 3);
}

#[tokio::test]
async fn removal_tombstones_and_notifies() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (item, _) = core.seed_item("a", "page-1", "hero", 0, "alice").await;

    coordinator.remove(&item.id, "alice").await.unwrap();

    let envelope = core
        .store
        .get(RecordKind::Structure, &item.id)
        .await
        .unwrap();
    assert!(envelope.tombstoned);
    assert!(coordinator.container_items(&Id::new("page-1")).await.unwrap().is_empty());
    assert_eq!(
        core.broadcaster
            .events_of_kind(EventKind::StructureUpdated)
            .len(),
        1
    );

    // Removing again reports the item as gone.
    let err = coordinator.remove(&item.id, "alice").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn compaction_densifies_one_lane_and_skips_clean_ones() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    core.seed_item("a", "page-1", "hero", 0, "alice").await;
    core.seed_item("b", "page-1", "hero", 5, "alice").await;
    core.seed_item("c", "page-1", "hero", 10, "alice").await;
    let (untouched, v_untouched) = core.seed_item("d", "page-1", "footer", 4, "alice").await;

    let result = coordinator
        .compact(&Id::new("page-1"), &Id::new("hero"), "alice")
        .await
        .unwrap();
    let mut orders: Vec<u32> = result.iter().map(|i| i.position.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![0, 1, 2]);
    assert_eq!(
        core.broadcaster
            .events_of_kind(EventKind::ReorderApplied)
            .len(),
        1
    );

    // The other lane was not touched.
    let envelope = core
        .store
        .get(RecordKind::Structure, &untouched.id)
        .await
        .unwrap();
    assert_eq!(envelope.version, v_untouched);

    // Compacting again is a no-op and publishes nothing further.
    coordinator
        .compact(&Id::new("page-1"), &Id::new("hero"), "alice")
        .await
        .unwrap();
    assert_eq!(
        core.broadcaster
            .events_of_kind(EventKind::ReorderApplied)
            .len(),
        1
    );
}

#[tokio::test]
async fn stale_cache_is_not_served_after_external_writes_through_the_coordinator() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (item, _) = core.seed_item("a", "page-1", "hero", 0, "alice").await;

    let warm = coordinator.container_items(&Id::new("page-1")).await.unwrap();
    assert_eq!(warm[0].position.order, 0);

    coordinator.reorder(&[op("a", 4)], "alice").await.unwrap();
    let fresh = coordinator.container_items(&Id::new("page-1")).await.unwrap();
    assert_eq!(fresh[0].position.order, 4);
    assert_eq!(fresh[0].id, item.id);
}

#[tokio::test]
async fn versions_advance_once_per_applied_operation() {
    let core = TestCore::new();
    let coordinator = core.coordinator();
    let (_, v0) = core.seed_item("a", "page-1", "hero", 0, "alice").await;

    coordinator.reorder(&[op("a", 1)], "alice").await.unwrap();
    let envelope = core
        .store
        .get(RecordKind::Structure, &Id::new("a"))
        .await
        .unwrap();
    assert_eq!(envelope.version, v0.next());
    assert_eq!(envelope.version, Version::new(1));
}
