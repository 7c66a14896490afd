mod common;

use packhouse_api::{
    entities::cold_room_box,
    errors::ServiceError,
    services::pallets::{ConsolidatePalletRequest, PalletBoxSelection},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

const SIZE_24: &str = "fuerte_4kg_class1_size24";
const SIZE_18: &str = "fuerte_4kg_class1_size18";
const HASS_14: &str = "hass_10kg_class2_size14";

fn selection(box_id: Uuid, take: i32) -> PalletBoxSelection {
    PalletBoxSelection {
        cold_room_box_id: box_id,
        quantity_to_take: take,
    }
}

/// Full take plus partial split, then dissolution returns every box and
/// merges the split part back into its residual sibling.
#[tokio::test]
async fn consolidate_and_dissolve_round_trip() {
    let (db, services) = common::setup().await;
    let room = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let record = common::create_counting_record(
        db.as_ref(),
        "Acme Farms",
        &[(SIZE_24, 100), (SIZE_18, 50)],
    )
    .await;
    let box1 = common::create_box(db.as_ref(), &record, &room, SIZE_24, 100).await;
    let box2 = common::create_box(db.as_ref(), &record, &room, SIZE_18, 50).await;

    let summary = services
        .pallets
        .consolidate(ConsolidatePalletRequest {
            name: "P-001".to_string(),
            cold_room_id: room.id,
            selections: vec![selection(box1.id, 100), selection(box2.id, 30)],
            boxes_per_pallet: None,
        })
        .await
        .unwrap();

    assert_eq!(summary.total_boxes, 130);
    assert_eq!(summary.boxes_per_pallet, 288); // 4kg default capacity
    assert_eq!(summary.complete_pallets, 0);
    assert_eq!(summary.remainder_boxes, 130);
    assert_eq!(summary.total_weight_kg, 520);

    // box1 consumed whole; box2 split into residual 20 + linked 30.
    let rows = services.pallets.list_boxes(room.id, false).await.unwrap();
    assert_eq!(rows.len(), 3);
    let b1 = rows.iter().find(|b| b.id == box1.id).unwrap();
    assert!(b1.is_in_pallet);
    assert_eq!(b1.pallet_id, Some(summary.id));
    let residual = rows.iter().find(|b| b.id == box2.id).unwrap();
    assert!(!residual.is_in_pallet);
    assert_eq!(residual.quantity, 20);
    let part = rows
        .iter()
        .find(|b| b.id != box1.id && b.id != box2.id)
        .unwrap();
    assert!(part.is_in_pallet);
    assert_eq!(part.quantity, 30);
    assert_eq!(part.size, residual.size);
    assert_eq!(part.source_counting_record_id, record.id);

    // Only the residual remains available for further consolidation.
    let available = services.pallets.list_boxes(room.id, true).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, box2.id);

    let dissolved = services.pallets.dissolve(summary.id).await.unwrap();
    assert_eq!(dissolved.boxes_returned, 130);

    // Split part merged back into its sibling; box1 released in place.
    let rows = services.pallets.list_boxes(room.id, false).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|b| !b.is_in_pallet && b.pallet_id.is_none()));
    let restored = rows.iter().find(|b| b.id == box2.id).unwrap();
    assert_eq!(restored.quantity, 50);
    let b1 = rows.iter().find(|b| b.id == box1.id).unwrap();
    assert_eq!(b1.quantity, 100);

    let err = services.pallets.get(summary.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn capacity_override_drives_aggregates() {
    let (db, services) = common::setup().await;
    let room = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let record =
        common::create_counting_record(db.as_ref(), "Acme Farms", &[(SIZE_24, 130)]).await;
    let b = common::create_box(db.as_ref(), &record, &room, SIZE_24, 130).await;

    let summary = services
        .pallets
        .consolidate(ConsolidatePalletRequest {
            name: "P-002".to_string(),
            cold_room_id: room.id,
            selections: vec![selection(b.id, 130)],
            boxes_per_pallet: Some(60),
        })
        .await
        .unwrap();

    assert_eq!(summary.complete_pallets, 2);
    assert_eq!(summary.remainder_boxes, 10);
}

#[tokio::test]
async fn consolidation_rejects_bad_requests() {
    let (db, services) = common::setup().await;
    let room = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let record = common::create_counting_record(
        db.as_ref(),
        "Acme Farms",
        &[(SIZE_24, 100), (HASS_14, 40)],
    )
    .await;
    let four_kg = common::create_box(db.as_ref(), &record, &room, SIZE_24, 100).await;
    let ten_kg = common::create_box(db.as_ref(), &record, &room, HASS_14, 40).await;

    let base = |selections: Vec<PalletBoxSelection>| ConsolidatePalletRequest {
        name: "P-003".to_string(),
        cold_room_id: room.id,
        selections,
        boxes_per_pallet: None,
    };

    // Blank name.
    let mut req = base(vec![selection(four_kg.id, 10)]);
    req.name = "   ".to_string();
    assert!(matches!(
        services.pallets.consolidate(req).await.unwrap_err(),
        ServiceError::ValidationError(_)
    ));

    // No selections at all.
    assert!(matches!(
        services.pallets.consolidate(base(vec![])).await.unwrap_err(),
        ServiceError::ValidationError(_)
    ));

    // Mixed box formats on one pallet.
    assert!(matches!(
        services
            .pallets
            .consolidate(base(vec![selection(four_kg.id, 10), selection(ten_kg.id, 10)]))
            .await
            .unwrap_err(),
        ServiceError::ValidationError(_)
    ));

    // Taking more than the batch holds.
    assert!(matches!(
        services
            .pallets
            .consolidate(base(vec![selection(four_kg.id, 101)]))
            .await
            .unwrap_err(),
        ServiceError::ValidationError(_)
    ));

    // Same box selected twice.
    assert!(matches!(
        services
            .pallets
            .consolidate(base(vec![selection(four_kg.id, 10), selection(four_kg.id, 5)]))
            .await
            .unwrap_err(),
        ServiceError::ValidationError(_)
    ));

    // Unknown box id.
    assert!(matches!(
        services
            .pallets
            .consolidate(base(vec![selection(Uuid::new_v4(), 10)]))
            .await
            .unwrap_err(),
        ServiceError::NotFound(_)
    ));

    // Nothing was committed by any of the rejected requests.
    let (pallets, total) = services.pallets.list(1, 20).await.unwrap();
    assert!(pallets.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn palletized_box_cannot_be_taken_again() {
    let (db, services) = common::setup().await;
    let room = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let record =
        common::create_counting_record(db.as_ref(), "Acme Farms", &[(SIZE_24, 100)]).await;
    let b = common::create_box(db.as_ref(), &record, &room, SIZE_24, 100).await;

    services
        .pallets
        .consolidate(ConsolidatePalletRequest {
            name: "P-004".to_string(),
            cold_room_id: room.id,
            selections: vec![selection(b.id, 100)],
            boxes_per_pallet: None,
        })
        .await
        .unwrap();

    let err = services
        .pallets
        .consolidate(ConsolidatePalletRequest {
            name: "P-005".to_string(),
            cold_room_id: room.id,
            selections: vec![selection(b.id, 10)],
            boxes_per_pallet: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

/// A linked box tampered with after consolidation makes the returned sum
/// disagree with the pallet's recorded total; dissolution must refuse to
/// touch anything.
#[tokio::test]
async fn dissolution_aborts_on_integrity_mismatch() {
    let (db, services) = common::setup().await;
    let room = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let record =
        common::create_counting_record(db.as_ref(), "Acme Farms", &[(SIZE_24, 100)]).await;
    let b = common::create_box(db.as_ref(), &record, &room, SIZE_24, 100).await;

    let summary = services
        .pallets
        .consolidate(ConsolidatePalletRequest {
            name: "P-006".to_string(),
            cold_room_id: room.id,
            selections: vec![selection(b.id, 100)],
            boxes_per_pallet: None,
        })
        .await
        .unwrap();

    // Corrupt the linked row out-of-band.
    let linked = cold_room_box::Entity::find()
        .filter(cold_room_box::Column::PalletId.eq(summary.id))
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut active: cold_room_box::ActiveModel = linked.into();
    active.quantity = Set(70);
    active.update(db.as_ref()).await.unwrap();

    let err = services.pallets.dissolve(summary.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::IntegrityError(_)));

    // Pallet and linkage are untouched.
    let still_there = services.pallets.get(summary.id).await.unwrap();
    assert_eq!(still_there.total_boxes, 100);
    let rows = services.pallets.list_boxes(room.id, false).await.unwrap();
    assert!(rows.iter().all(|r| r.is_in_pallet));
}

#[tokio::test]
async fn dissolving_unknown_pallet_is_not_found() {
    let (_db, services) = common::setup().await;
    let err = services.pallets.dissolve(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
