use crate::{
    db::DbPool,
    entities::{
        balance_entry::{self, Entity as BalanceEntry},
        cold_room_box::{self, Entity as ColdRoomBox},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::size_group::LoadingHistoryEntry,
};
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Durable per-size-group balance store (loaded quantity + history),
/// keyed by the stable unique key.
///
/// Reads degrade to "no prior balance" on failure; the ledger is a derived
/// cache of ground truth that can be rebuilt from cold-room inventory (see
/// [`BalanceService::rebuild_from_inventory`]). Writes never degrade.
///
/// Commits racing on the same key are serialized through a per-key lock so
/// loaded quantities are always read-modify-write, never last-writer-wins.
pub struct BalanceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BalanceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
            key_locks: DashMap::new(),
        }
    }

    /// Serialization point for one unique key. Callers hold the guard for
    /// the whole read-modify-write of that key; different keys proceed in
    /// parallel.
    pub fn key_lock(&self, unique_key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(unique_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetches one ledger entry. A read failure is logged and treated as
    /// "no prior balance" rather than surfaced as an error.
    pub async fn get(&self, unique_key: &str) -> Option<balance_entry::Model> {
        match BalanceEntry::find_by_id(unique_key.to_string())
            .one(self.db_pool.as_ref())
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!(unique_key, error = %e, "balance read failed; treating as empty");
                None
            }
        }
    }

    /// Fetches all ledger entries for a set of counting records, keyed by
    /// unique key. Read failures degrade to an empty map.
    pub async fn entries_for_records(
        &self,
        record_ids: &[Uuid],
    ) -> HashMap<String, balance_entry::Model> {
        if record_ids.is_empty() {
            return HashMap::new();
        }
        match BalanceEntry::find()
            .filter(balance_entry::Column::CountingRecordId.is_in(record_ids.iter().copied()))
            .all(self.db_pool.as_ref())
            .await
        {
            Ok(entries) => entries
                .into_iter()
                .map(|e| (e.unique_key.clone(), e))
                .collect(),
            Err(e) => {
                warn!(error = %e, "balance bulk read failed; treating as empty");
                HashMap::new()
            }
        }
    }

    /// Read-modify-write of one ledger entry inside the caller's
    /// transaction. The caller must hold the key lock for `unique_key`.
    pub async fn apply_load_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        unique_key: &str,
        counting_record_id: Uuid,
        quantity: i32,
        cold_room_id: Uuid,
    ) -> Result<balance_entry::Model, ServiceError> {
        let now = Utc::now();
        let history_entry = LoadingHistoryEntry {
            quantity,
            cold_room_id,
            at: now,
        };

        let existing = BalanceEntry::find_by_id(unique_key.to_string())
            .one(conn)
            .await?;

        let updated = match existing {
            Some(entry) => {
                let mut history = entry.history();
                history.push(history_entry);
                let mut active: balance_entry::ActiveModel = entry.clone().into();
                active.loaded_quantity = Set(entry.loaded_quantity + quantity);
                active.loading_history = Set(serde_json::to_value(&history)
                    .map_err(|e| ServiceError::InternalError(e.to_string()))?);
                active.updated_at = Set(now);
                active.update(conn).await?
            }
            None => {
                let active = balance_entry::ActiveModel {
                    unique_key: Set(unique_key.to_string()),
                    counting_record_id: Set(counting_record_id),
                    loaded_quantity: Set(quantity),
                    loading_history: Set(serde_json::to_value(vec![history_entry])
                        .map_err(|e| ServiceError::InternalError(e.to_string()))?),
                    updated_at: Set(now),
                };
                active.insert(conn).await?
            }
        };

        Ok(updated)
    }

    /// Administrative override: zeroes the loaded quantity and clears the
    /// history for one key. Never called implicitly.
    #[instrument(skip(self))]
    pub async fn reset(&self, unique_key: &str) -> Result<(), ServiceError> {
        let lock = self.key_lock(unique_key);
        let _guard = lock.lock().await;

        let existing = BalanceEntry::find_by_id(unique_key.to_string())
            .one(self.db_pool.as_ref())
            .await?;

        if let Some(entry) = existing {
            let mut active: balance_entry::ActiveModel = entry.into();
            active.loaded_quantity = Set(0);
            active.loading_history = Set(serde_json::json!([]));
            active.updated_at = Set(Utc::now());
            active.update(self.db_pool.as_ref()).await?;
        }

        if let Err(e) = self
            .event_sender
            .send(Event::BalanceReset {
                unique_key: unique_key.to_string(),
            })
            .await
        {
            warn!(unique_key, error = %e, "event send failed for balance reset");
        }

        Ok(())
    }

    /// Wipes the entire store. Explicit "start over" action only.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<u64, ServiceError> {
        let result = BalanceEntry::delete_many()
            .exec(self.db_pool.as_ref())
            .await?;

        if let Err(e) = self
            .event_sender
            .send(Event::BalanceCleared {
                entries_removed: result.rows_affected,
            })
            .await
        {
            warn!(error = %e, "event send failed for balance clear");
        }

        info!(removed = result.rows_affected, "balance store cleared");
        Ok(result.rows_affected)
    }

    /// Disaster-recovery repair path: recomputes every ledger entry from
    /// actual cold-room box presence (palletized parts included) and
    /// replaces the store wholesale. Explicit maintenance operation; never
    /// run automatically on reads.
    #[instrument(skip(self))]
    pub async fn rebuild_from_inventory(&self) -> Result<usize, ServiceError> {
        let boxes = ColdRoomBox::find().all(self.db_pool.as_ref()).await?;

        // unique key -> (record id, per-room committed quantities)
        let mut grouped: HashMap<String, (Uuid, Vec<(Uuid, i32)>)> = HashMap::new();
        for b in &boxes {
            let bucket = b.bucket().map_err(|e| {
                ServiceError::IntegrityError(format!(
                    "cold-room box {} has an undecodable bucket: {}",
                    b.id, e
                ))
            })?;
            let key = bucket.unique_key(b.source_counting_record_id);
            let slot = grouped
                .entry(key)
                .or_insert((b.source_counting_record_id, Vec::new()));
            slot.1.push((b.cold_room_id, b.quantity));
        }

        let now = Utc::now();
        let mut entries = Vec::with_capacity(grouped.len());
        for (unique_key, (record_id, rooms)) in grouped {
            let loaded: i32 = rooms.iter().map(|(_, q)| q).sum();
            let history: Vec<LoadingHistoryEntry> = rooms
                .into_iter()
                .map(|(cold_room_id, quantity)| LoadingHistoryEntry {
                    quantity,
                    cold_room_id,
                    at: now,
                })
                .collect();
            entries.push(balance_entry::ActiveModel {
                unique_key: Set(unique_key),
                counting_record_id: Set(record_id),
                loaded_quantity: Set(loaded),
                loading_history: Set(serde_json::to_value(&history)
                    .map_err(|e| ServiceError::InternalError(e.to_string()))?),
                updated_at: Set(now),
            });
        }
        let written = entries.len();

        // Wipe and rewrite atomically so a failure mid-rebuild cannot
        // leave the ledger empty.
        let db = self.db_pool.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                BalanceEntry::delete_many().exec(txn).await?;
                for entry in entries {
                    entry.insert(txn).await?;
                }
                Ok(())
            })
        })
        .await
        .map_err(unwrap_txn_err)?;

        if let Err(e) = self
            .event_sender
            .send(Event::BalanceRebuilt {
                entries_written: written,
            })
            .await
        {
            warn!(error = %e, "event send failed for balance rebuild");
        }

        info!(entries = written, "balance store rebuilt from inventory");
        Ok(written)
    }

    /// Number of persisted entries; used by the health/maintenance surface.
    pub async fn entry_count(&self) -> Result<u64, ServiceError> {
        Ok(BalanceEntry::find().count(self.db_pool.as_ref()).await?)
    }
}

pub(crate) fn unwrap_txn_err(e: sea_orm::TransactionError<ServiceError>) -> ServiceError {
    match e {
        sea_orm::TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        sea_orm::TransactionError::Transaction(service_err) => service_err,
    }
}
