#![allow(dead_code)]

use chrono::Utc;
use packhouse_api::{
    db::{self, DbConfig, DbPool},
    entities::{cold_room, cold_room_box, counting_record},
    events::EventSender,
    handlers::AppServices,
};
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Fresh isolated in-memory database plus the full service stack.
///
/// A single-connection pool keeps one sqlite in-memory database alive for
/// the whole test; services never hold the connection across calls, so one
/// connection is enough.
pub async fn setup() -> (Arc<DbPool>, AppServices) {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = Arc::new(
        db::establish_connection_with_config(&config)
            .await
            .expect("Failed to create DB pool"),
    );
    db::run_migrations(pool.as_ref())
        .await
        .expect("Failed to run migrations");

    let (tx, mut rx) = mpsc::channel(256);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let services = AppServices::new(pool.clone(), Arc::new(EventSender::new(tx)));

    (pool, services)
}

/// Like [`setup`], but with the event receiver already dropped, so every
/// event send fails. Used to verify mutations survive a dead channel.
pub async fn setup_with_closed_events() -> (Arc<DbPool>, AppServices) {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = Arc::new(
        db::establish_connection_with_config(&config)
            .await
            .expect("Failed to create DB pool"),
    );
    db::run_migrations(pool.as_ref())
        .await
        .expect("Failed to run migrations");

    let (tx, rx) = mpsc::channel(256);
    drop(rx);
    let services = AppServices::new(pool.clone(), Arc::new(EventSender::new(tx)));

    (pool, services)
}

pub async fn create_cold_room(db: &DbPool, name: &str) -> cold_room::Model {
    cold_room::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to create cold room")
}

/// Counting record whose totals and remaining snapshot are the same map.
pub async fn create_counting_record(
    db: &DbPool,
    supplier: &str,
    buckets: &[(&str, i64)],
) -> counting_record::Model {
    let map: serde_json::Map<String, serde_json::Value> = buckets
        .iter()
        .map(|(k, q)| (k.to_string(), serde_json::json!(q)))
        .collect();
    let now = Utc::now();
    counting_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        supplier_name: Set(supplier.to_string()),
        region: Set(Some("Limpopo".to_string())),
        submitted_at: Set(now),
        counting_totals: Set(serde_json::Value::Object(map.clone())),
        remaining_boxes: Set(serde_json::Value::Object(map)),
        has_remaining: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to create counting record")
}

/// Box batch already sitting in a cold room, outside any pallet.
pub async fn create_box(
    db: &DbPool,
    record: &counting_record::Model,
    room: &cold_room::Model,
    bucket_key: &str,
    quantity: i32,
) -> cold_room_box::Model {
    let bucket = packhouse_api::models::BucketKey::parse(bucket_key).expect("bad bucket key");
    let now = Utc::now();
    cold_room_box::ActiveModel {
        id: Set(Uuid::new_v4()),
        variety: Set(bucket.variety.clone()),
        box_type: Set(bucket.box_type.as_str().to_string()),
        grade: Set(bucket.grade.clone()),
        size: Set(bucket.size.as_str().to_string()),
        quantity: Set(quantity),
        cold_room_id: Set(room.id),
        supplier_name: Set(record.supplier_name.clone()),
        source_counting_record_id: Set(record.id),
        is_in_pallet: Set(false),
        pallet_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to create cold room box")
}
