mod common;

use packhouse_api::{
    models::BucketKey,
    services::loading::{BatchOutcome, SizeGroupLoad},
};

const FUERTE_24: &str = "fuerte_4kg_class1_size24";

fn load(
    record_id: uuid::Uuid,
    bucket_key: &str,
    quantity: i32,
    room_id: uuid::Uuid,
) -> SizeGroupLoad {
    SizeGroupLoad {
        counting_record_id: record_id,
        bucket: BucketKey::parse(bucket_key).unwrap(),
        loading_quantity: quantity,
        cold_room_id: room_id,
    }
}

/// The full reconciliation walk-through: count 500, load 200, re-derive,
/// get blocked on a duplicate re-load, finish into a second room.
#[tokio::test]
async fn balance_reconciliation_flow() {
    let (db, services) = common::setup().await;
    let room1 = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let room2 = common::create_cold_room(db.as_ref(), "coldroom2").await;
    let record = common::create_counting_record(db.as_ref(), "Acme Farms", &[(FUERTE_24, 500)]).await;

    // Initial derivation: 500 remaining, nothing loaded.
    let groups = services.size_groups.derive(&[record.id]).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].total_quantity, 500);
    assert_eq!(groups[0].loaded_quantity, 0);
    assert_eq!(groups[0].remaining_quantity, 500);

    // Load 200 into coldroom1.
    let result = services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 200, room1.id)])
        .await
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Full);
    assert_eq!(result.committed.len(), 1);
    assert_eq!(result.committed[0].loaded_quantity, 200);
    assert_eq!(result.committed[0].remaining_quantity, 300);

    // Re-derivation reflects the ledger: 300 remaining, not 500.
    let groups = services.size_groups.derive(&[record.id]).await.unwrap();
    assert_eq!(groups[0].loaded_quantity, 200);
    assert_eq!(groups[0].remaining_quantity, 300);

    // Loading 300 again into coldroom1 with a 300-quantity box already
    // there... first put one there by committing, then retry the same load.
    let result = services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 300, room1.id)])
        .await
        .unwrap();
    assert_eq!(result.committed.len(), 1);

    // Retry of the identical request is flagged duplicate and skipped.
    // Duplicates are soft, so the batch is Partial, not Failed.
    let retry = services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 300, room1.id)])
        .await
        .unwrap();
    assert_eq!(retry.outcome, BatchOutcome::Partial);
    assert!(retry.committed.is_empty());
    assert!(retry.failed.is_empty());
    assert_eq!(retry.skipped_duplicates.len(), 1);
    assert_eq!(retry.skipped_duplicates[0].existing_quantity, 500);

    // Ledger unchanged by the duplicate.
    let groups = services.size_groups.derive(&[record.id]).await.unwrap();
    assert_eq!(groups[0].loaded_quantity, 500);
    assert_eq!(groups[0].remaining_quantity, 0);
    assert!(!groups[0].is_loadable());

    // Fully loaded record is no longer offered as a loadable source, but
    // still exists for inspection.
    let (loadable, _) = services.size_groups.list_records(1, 20, true).await.unwrap();
    assert!(loadable.is_empty());
    let (all, total) = services.size_groups.list_records(1, 20, false).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(all[0].id, record.id);

    // A different target room for the same bucket is NOT a duplicate; but
    // here nothing remains, so the overrun guard rejects it.
    let overrun = services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 100, room2.id)])
        .await
        .unwrap();
    assert_eq!(overrun.outcome, BatchOutcome::Failed);
    assert_eq!(overrun.committed.len(), 0);
    assert_eq!(overrun.failed.len(), 1);
}

/// Loading the same bucket into two different rooms splits the balance
/// between them; conservation holds throughout.
#[tokio::test]
async fn split_across_rooms_conserves_balance() {
    let (db, services) = common::setup().await;
    let room1 = common::create_cold_room(db.as_ref(), "coldroom1").await;
    let room2 = common::create_cold_room(db.as_ref(), "coldroom2").await;
    let record = common::create_counting_record(db.as_ref(), "Acme Farms", &[(FUERTE_24, 500)]).await;

    services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 200, room1.id)])
        .await
        .unwrap();
    let result = services
        .loading
        .commit_loads(&[load(record.id, FUERTE_24, 300, room2.id)])
        .await
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Full);

    let groups = services.size_groups.derive(&[record.id]).await.unwrap();
    assert_eq!(groups[0].loaded_quantity, 500);
    assert_eq!(groups[0].remaining_quantity, 0);
    assert_eq!(
        groups[0].loaded_quantity + groups[0].remaining_quantity,
        groups[0].total_quantity
    );
    assert_eq!(groups[0].loading_history.len(), 2);
}

/// Derivation without an intervening commit is idempotent, including order.
#[tokio::test]
async fn repeated_derivation_is_identical() {
    let (db, services) = common::setup().await;
    let record = common::create_counting_record(
        db.as_ref(),
        "Acme Farms",
        &[
            ("fuerte_4kg_class1_size12", 100),
            ("fuerte_4kg_class1_size18", 400),
            ("hass_10kg_class2_size14", 100),
        ],
    )
    .await;

    let first = services.size_groups.derive(&[record.id]).await.unwrap();
    let second = services.size_groups.derive(&[record.id]).await.unwrap();

    let keys1: Vec<&str> = first.iter().map(|g| g.unique_key.as_str()).collect();
    let keys2: Vec<&str> = second.iter().map(|g| g.unique_key.as_str()).collect();
    assert_eq!(keys1, keys2);

    // Highest remaining first, size tie-break ascending.
    assert_eq!(first[0].bucket.size.as_str(), "size18");
    assert_eq!(first[1].bucket.size.as_str(), "size12");
    assert_eq!(first[2].bucket.size.as_str(), "size14");
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let (_db, services) = common::setup().await;
    let err = services
        .size_groups
        .derive(&[uuid::Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        packhouse_api::errors::ServiceError::NotFound(_)
    ));
}
