use crate::{
    db::DbPool,
    entities::{
        cold_room::Entity as ColdRoom,
        cold_room_box::{self, Entity as ColdRoomBox},
        counting_record::{self, Entity as CountingRecord},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::bucket::BucketKey,
    services::{
        balance::{unwrap_txn_err, BalanceService},
        size_groups::derive_for_record,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One requested size-group load.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SizeGroupLoad {
    pub counting_record_id: Uuid,
    pub bucket: BucketKey,
    #[validate(range(min = 1))]
    pub loading_quantity: i32,
    pub cold_room_id: Uuid,
}

impl SizeGroupLoad {
    pub fn unique_key(&self) -> String {
        self.bucket.unique_key(self.counting_record_id)
    }
}

/// Outcome of the duplicate/overrun guard for one load.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DuplicateCheckResult {
    pub unique_key: String,
    pub cold_room_id: Uuid,
    pub already_exists: bool,
    pub existing_quantity: i32,
    pub requested_quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommittedLoad {
    pub unique_key: String,
    pub box_id: Uuid,
    pub cold_room_id: Uuid,
    pub quantity: i32,
    pub loaded_quantity: i32,
    pub remaining_quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailedLoad {
    pub unique_key: String,
    pub reason: String,
}

/// Batch-level result. Never a bare boolean: callers always see which
/// loads were committed, which were skipped as duplicates, and which
/// failed, plus the overall outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitResult {
    pub outcome: BatchOutcome,
    pub committed: Vec<CommittedLoad>,
    pub skipped_duplicates: Vec<DuplicateCheckResult>,
    pub failed: Vec<FailedLoad>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Full,
    Partial,
    Failed,
}

/// Commits size-group loads into cold-room inventory.
///
/// Each load is independent: validation failures and duplicates are
/// reported per item while the rest of the batch proceeds, and a failure
/// writing one load never rolls back the others.
pub struct LoadingService {
    db_pool: Arc<DbPool>,
    balance: Arc<BalanceService>,
    event_sender: Arc<EventSender>,
}

impl LoadingService {
    pub fn new(
        db_pool: Arc<DbPool>,
        balance: Arc<BalanceService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db_pool,
            balance,
            event_sender,
        }
    }

    /// Sums existing cold-room inventory matching the load's bucket,
    /// source record, and target room. Palletized split parts count: a
    /// re-sent load is still a duplicate after its boxes were palletized.
    async fn existing_quantity<C: ConnectionTrait>(
        &self,
        conn: &C,
        load: &SizeGroupLoad,
    ) -> Result<i32, ServiceError> {
        let boxes = ColdRoomBox::find()
            .filter(cold_room_box::Column::SourceCountingRecordId.eq(load.counting_record_id))
            .filter(cold_room_box::Column::ColdRoomId.eq(load.cold_room_id))
            .filter(cold_room_box::Column::Variety.eq(load.bucket.variety.clone()))
            .filter(cold_room_box::Column::BoxType.eq(load.bucket.box_type.as_str()))
            .filter(cold_room_box::Column::Grade.eq(load.bucket.grade.clone()))
            .filter(cold_room_box::Column::Size.eq(load.bucket.size.as_str()))
            .all(conn)
            .await?;
        Ok(boxes.iter().map(|b| b.quantity).sum())
    }

    /// Duplicate/overrun guard: a load is a duplicate iff matching
    /// inventory already satisfies the requested quantity.
    pub async fn check_duplicate(
        &self,
        load: &SizeGroupLoad,
    ) -> Result<DuplicateCheckResult, ServiceError> {
        let existing = self
            .existing_quantity(self.db_pool.as_ref(), load)
            .await?;
        Ok(DuplicateCheckResult {
            unique_key: load.unique_key(),
            cold_room_id: load.cold_room_id,
            already_exists: existing >= load.loading_quantity,
            existing_quantity: existing,
            requested_quantity: load.loading_quantity,
        })
    }

    pub async fn check_duplicates(
        &self,
        loads: &[SizeGroupLoad],
    ) -> Result<Vec<DuplicateCheckResult>, ServiceError> {
        let mut results = Vec::with_capacity(loads.len());
        for load in loads {
            results.push(self.check_duplicate(load).await?);
        }
        Ok(results)
    }

    /// Validates one load against its counting record. Returns the total
    /// counted quantity for the bucket.
    async fn validate_load(&self, load: &SizeGroupLoad) -> Result<i32, ServiceError> {
        load.validate().map_err(|_| {
            ServiceError::ValidationError(format!(
                "loading quantity must be positive, got {}",
                load.loading_quantity
            ))
        })?;

        if ColdRoom::find_by_id(load.cold_room_id)
            .one(self.db_pool.as_ref())
            .await?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "unknown cold room {}",
                load.cold_room_id
            )));
        }

        let record = CountingRecord::find_by_id(load.counting_record_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "counting record {} not found",
                    load.counting_record_id
                ))
            })?;

        let total = record
            .counting_totals
            .as_object()
            .and_then(|map| {
                map.iter().find_map(|(key, value)| {
                    BucketKey::parse(key)
                        .ok()
                        .filter(|b| *b == load.bucket)
                        .and_then(|_| value.as_i64())
                        .and_then(|q| i32::try_from(q).ok())
                })
            })
            .unwrap_or(0);

        if total == 0 {
            return Err(ServiceError::ValidationError(format!(
                "bucket {} was never counted on record {}",
                load.bucket, load.counting_record_id
            )));
        }

        Ok(total)
    }

    /// Commits one validated load: guard check, then box insert + ledger
    /// read-modify-write in a single transaction under the key lock.
    async fn commit_one(
        &self,
        load: &SizeGroupLoad,
        total_quantity: i32,
    ) -> Result<Result<CommittedLoad, DuplicateCheckResult>, ServiceError> {
        let unique_key = load.unique_key();
        let lock = self.balance.key_lock(&unique_key);
        let _guard = lock.lock().await;

        // Guard runs under the key lock, immediately before commit, so the
        // window between check and insert is as small as this design allows.
        let duplicate = self.check_duplicate(load).await?;
        if duplicate.already_exists {
            return Ok(Err(duplicate));
        }

        let db = self.db_pool.as_ref();
        let balance = Arc::clone(&self.balance);
        let load = load.clone();
        let key = unique_key.clone();
        let committed = db
            .transaction::<_, CommittedLoad, ServiceError>(move |txn| {
                Box::pin(async move {
                    let entry = balance
                        .apply_load_on(
                            txn,
                            &key,
                            load.counting_record_id,
                            load.loading_quantity,
                            load.cold_room_id,
                        )
                        .await?;

                    // Overrun check against the ledger state inside the
                    // same transaction that updates it.
                    if entry.loaded_quantity > total_quantity {
                        return Err(ServiceError::ValidationError(format!(
                            "loading {} would exceed remaining quantity ({} of {} already loaded)",
                            load.loading_quantity,
                            entry.loaded_quantity - load.loading_quantity,
                            total_quantity
                        )));
                    }

                    let record = CountingRecord::find_by_id(load.counting_record_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "counting record {} disappeared mid-commit",
                                load.counting_record_id
                            ))
                        })?;

                    let now = Utc::now();
                    let box_row = cold_room_box::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        variety: Set(load.bucket.variety.clone()),
                        box_type: Set(load.bucket.box_type.as_str().to_string()),
                        grade: Set(load.bucket.grade.clone()),
                        size: Set(load.bucket.size.as_str().to_string()),
                        quantity: Set(load.loading_quantity),
                        cold_room_id: Set(load.cold_room_id),
                        supplier_name: Set(record.supplier_name.clone()),
                        source_counting_record_id: Set(load.counting_record_id),
                        is_in_pallet: Set(false),
                        pallet_id: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let inserted = box_row.insert(txn).await?;

                    Ok(CommittedLoad {
                        unique_key: key,
                        box_id: inserted.id,
                        cold_room_id: load.cold_room_id,
                        quantity: load.loading_quantity,
                        loaded_quantity: entry.loaded_quantity,
                        remaining_quantity: (total_quantity - entry.loaded_quantity).max(0),
                    })
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        Ok(Ok(committed))
    }

    /// Commits a batch of size-group loads. Partial success is normal:
    /// per-item outcomes are collected and the batch never aborts early.
    #[instrument(skip(self, loads), fields(batch_size = loads.len()))]
    pub async fn commit_loads(&self, loads: &[SizeGroupLoad]) -> Result<CommitResult, ServiceError> {
        let mut committed = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let mut touched_records = HashSet::new();

        for load in loads {
            let unique_key = load.unique_key();

            let total = match self.validate_load(load).await {
                Ok(total) => total,
                Err(e) => {
                    warn!(unique_key, error = %e, "load failed validation");
                    failed.push(FailedLoad {
                        unique_key,
                        reason: e.response_message(),
                    });
                    continue;
                }
            };

            match self.commit_one(load, total).await {
                Ok(Ok(result)) => {
                    touched_records.insert(load.counting_record_id);
                    // The commit is durable at this point; a dead event
                    // channel must not turn it into a batch error.
                    if let Err(e) = self
                        .event_sender
                        .send(Event::LoadCommitted {
                            unique_key: result.unique_key.clone(),
                            counting_record_id: load.counting_record_id,
                            cold_room_id: result.cold_room_id,
                            quantity: result.quantity,
                            loaded_total: result.loaded_quantity,
                            at: Utc::now(),
                        })
                        .await
                    {
                        warn!(unique_key, error = %e, "event send failed for committed load");
                    }
                    committed.push(result);
                }
                Ok(Err(duplicate)) => {
                    info!(
                        unique_key,
                        existing = duplicate.existing_quantity,
                        "duplicate load skipped"
                    );
                    skipped.push(duplicate);
                }
                Err(e) => {
                    warn!(unique_key, error = %e, "load commit failed");
                    failed.push(FailedLoad {
                        unique_key,
                        reason: e.response_message(),
                    });
                }
            }
        }

        for record_id in touched_records {
            self.recompute_has_remaining(record_id).await?;
        }

        // Duplicates are soft: a batch counts as Failed only when real
        // failures occurred and nothing committed.
        let outcome = if failed.is_empty() && skipped.is_empty() {
            BatchOutcome::Full
        } else if committed.is_empty() && !failed.is_empty() {
            BatchOutcome::Failed
        } else {
            BatchOutcome::Partial
        };

        Ok(CommitResult {
            outcome,
            committed,
            skipped_duplicates: skipped,
            failed,
        })
    }

    /// Recomputes a record's "still offers loadable boxes" flag from the
    /// union of its derived size-groups. Records at zero remaining stop
    /// being offered as sources but are never deleted.
    async fn recompute_has_remaining(&self, record_id: Uuid) -> Result<(), ServiceError> {
        let record = CountingRecord::find_by_id(record_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("counting record {} not found", record_id))
            })?;

        let ledger = self.balance.entries_for_records(&[record_id]).await;
        let has_remaining = derive_for_record(&record, &ledger)
            .iter()
            .any(|g| g.is_loadable());

        if record.has_remaining != has_remaining {
            let mut active: counting_record::ActiveModel = record.into();
            active.has_remaining = Set(has_remaining);
            active.updated_at = Set(Utc::now());
            active.update(self.db_pool.as_ref()).await?;
        }
        Ok(())
    }
}
