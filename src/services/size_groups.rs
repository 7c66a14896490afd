use crate::{
    db::DbPool,
    entities::{
        balance_entry,
        counting_record::{self, Entity as CountingRecord},
    },
    errors::ServiceError,
    models::{
        bucket::BucketKey,
        size_group::SizeGroup,
    },
    services::balance::BalanceService,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Derives the current list of size-groups from counting records plus the
/// persisted balance ledger.
///
/// Derivation is a pure function of its inputs: re-running it without an
/// intervening commit yields identical output, and re-running it after a
/// commit reflects the updated ledger without double-subtracting.
pub struct SizeGroupService {
    db_pool: Arc<DbPool>,
    balance: Arc<BalanceService>,
}

/// Decodes a JSON quantity map (`bucket key -> non-negative count`).
/// Unparseable keys and non-integer values are skipped with a warning.
fn quantity_map(record_id: Uuid, raw: &serde_json::Value) -> Vec<(BucketKey, i32)> {
    let Some(map) = raw.as_object() else {
        warn!(%record_id, "quantity map is not a JSON object; ignoring");
        return Vec::new();
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let bucket = match BucketKey::parse(key) {
            Ok(b) => b,
            Err(e) => {
                warn!(%record_id, key, error = %e, "skipping undecodable bucket key");
                continue;
            }
        };
        let Some(quantity) = value.as_i64().and_then(|q| i32::try_from(q).ok()) else {
            warn!(%record_id, key, "skipping non-integer quantity");
            continue;
        };
        if quantity < 0 {
            warn!(%record_id, key, quantity, "skipping negative quantity");
            continue;
        }
        out.push((bucket, quantity));
    }
    out
}

/// Pure derivation for one counting record. The ledger map is keyed by
/// unique key; entries missing from it mean "nothing loaded yet".
///
/// The `remaining_boxes` snapshot only gates which buckets are considered
/// (quantity > 0); the authoritative remaining figure is always
/// `max(0, original - ledger.loaded)`. A bucket whose original quantity
/// cannot be found derives with total 0 and is never offered as loadable.
pub fn derive_for_record(
    record: &counting_record::Model,
    ledger: &HashMap<String, balance_entry::Model>,
) -> Vec<SizeGroup> {
    // Totals are matched on the decomposed key, so `24` vs `size24` token
    // differences between the two maps cannot cause a miss.
    let totals: HashMap<BucketKey, i32> = quantity_map(record.id, &record.counting_totals)
        .into_iter()
        .collect();

    let mut groups = Vec::new();
    for (bucket, snapshot_remaining) in quantity_map(record.id, &record.remaining_boxes) {
        if snapshot_remaining == 0 {
            continue;
        }
        let total = totals.get(&bucket).copied().unwrap_or_else(|| {
            warn!(
                record_id = %record.id,
                bucket = %bucket,
                "remaining-boxes key has no counted total; clamping to 0"
            );
            0
        });
        let unique_key = bucket.unique_key(record.id);
        let (loaded, history) = ledger
            .get(&unique_key)
            .map(|e| (e.loaded_quantity, e.history()))
            .unwrap_or((0, Vec::new()));
        groups.push(SizeGroup::from_balance(
            record.id,
            &record.supplier_name,
            bucket,
            total,
            loaded,
            history,
        ));
    }
    groups
}

/// Presentation order: descending remaining quantity, ties broken by
/// ascending lexical size. Stable so repeated derivations are reproducible.
pub fn sort_for_presentation(groups: &mut [SizeGroup]) {
    groups.sort_by(|a, b| {
        b.remaining_quantity
            .cmp(&a.remaining_quantity)
            .then_with(|| a.bucket.size.cmp(&b.bucket.size))
    });
}

impl SizeGroupService {
    pub fn new(db_pool: Arc<DbPool>, balance: Arc<BalanceService>) -> Self {
        Self { db_pool, balance }
    }

    /// Derives size-groups for the selected counting records, merged with
    /// the persisted ledger and sorted for presentation.
    #[instrument(skip(self))]
    pub async fn derive(&self, record_ids: &[Uuid]) -> Result<Vec<SizeGroup>, ServiceError> {
        if record_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = CountingRecord::find()
            .filter(counting_record::Column::Id.is_in(record_ids.iter().copied()))
            .all(self.db_pool.as_ref())
            .await?;

        if records.len() != record_ids.len() {
            let found: Vec<Uuid> = records.iter().map(|r| r.id).collect();
            let missing: Vec<String> = record_ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ServiceError::NotFound(format!(
                "counting records not found: {}",
                missing.join(", ")
            )));
        }

        // Ledger read failures degrade to "no prior balance".
        let ledger = self.balance.entries_for_records(record_ids).await;

        let mut groups = Vec::new();
        for record in &records {
            groups.extend(derive_for_record(record, &ledger));
        }
        sort_for_presentation(&mut groups);
        Ok(groups)
    }

    /// Lists counting records, optionally only those still offering
    /// loadable boxes, newest first.
    pub async fn list_records(
        &self,
        page: u64,
        limit: u64,
        only_with_remaining: bool,
    ) -> Result<(Vec<counting_record::Model>, u64), ServiceError> {
        let mut query = CountingRecord::find();
        if only_with_remaining {
            query = query.filter(counting_record::Column::HasRemaining.eq(true));
        }
        let paginator = query
            .order_by_desc(counting_record::Column::SubmittedAt)
            .paginate(self.db_pool.as_ref(), limit.max(1));

        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((records, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(id: Uuid, totals: serde_json::Value, remaining: serde_json::Value) -> counting_record::Model {
        counting_record::Model {
            id,
            supplier_name: "Acme Farms".to_string(),
            region: Some("Limpopo".to_string()),
            submitted_at: Utc::now(),
            counting_totals: totals,
            remaining_boxes: remaining,
            has_remaining: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn derivation_is_idempotent() {
        let id = Uuid::new_v4();
        let rec = record(
            id,
            json!({"fuerte_4kg_class1_size24": 500}),
            json!({"fuerte_4kg_class1_size24": 500}),
        );
        let ledger = HashMap::new();
        let first = derive_for_record(&rec, &ledger);
        let second = derive_for_record(&rec, &ledger);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].unique_key, second[0].unique_key);
        assert_eq!(first[0].remaining_quantity, second[0].remaining_quantity);
        assert_eq!(first[0].remaining_quantity, 500);
    }

    #[test]
    fn tolerates_bare_size_tokens_between_maps() {
        let id = Uuid::new_v4();
        // Totals keyed `size24`, snapshot keyed bare `24`.
        let rec = record(
            id,
            json!({"fuerte_4kg_class1_size24": 300}),
            json!({"fuerte_4kg_class1_24": 120}),
        );
        let groups = derive_for_record(&rec, &HashMap::new());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_quantity, 300);
        assert_eq!(groups[0].bucket.size.as_str(), "size24");
    }

    #[test]
    fn stale_remaining_key_clamps_to_zero_and_is_not_loadable() {
        let id = Uuid::new_v4();
        let rec = record(
            id,
            json!({"fuerte_4kg_class1_size24": 500}),
            json!({"hass_10kg_class2_size18": 40}),
        );
        let groups = derive_for_record(&rec, &HashMap::new());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_quantity, 0);
        assert_eq!(groups[0].remaining_quantity, 0);
        assert!(!groups[0].is_loadable());
    }

    #[test]
    fn ledger_loaded_quantity_reduces_remaining() {
        let id = Uuid::new_v4();
        let rec = record(
            id,
            json!({"fuerte_4kg_class1_size24": 500}),
            json!({"fuerte_4kg_class1_size24": 500}),
        );
        let bucket = BucketKey::parse("fuerte_4kg_class1_size24").unwrap();
        let unique_key = bucket.unique_key(id);
        let mut ledger = HashMap::new();
        ledger.insert(
            unique_key.clone(),
            balance_entry::Model {
                unique_key,
                counting_record_id: id,
                loaded_quantity: 200,
                loading_history: json!([]),
                updated_at: Utc::now(),
            },
        );
        let groups = derive_for_record(&rec, &ledger);
        assert_eq!(groups[0].loaded_quantity, 200);
        assert_eq!(groups[0].remaining_quantity, 300);
    }

    #[test]
    fn presentation_sort_is_desc_remaining_then_asc_size() {
        let id = Uuid::new_v4();
        let rec = record(
            id,
            json!({
                "fuerte_4kg_class1_size12": 100,
                "fuerte_4kg_class1_size24": 100,
                "fuerte_4kg_class1_size18": 400
            }),
            json!({
                "fuerte_4kg_class1_size12": 100,
                "fuerte_4kg_class1_size24": 100,
                "fuerte_4kg_class1_size18": 400
            }),
        );
        let mut groups = derive_for_record(&rec, &HashMap::new());
        sort_for_presentation(&mut groups);
        assert_eq!(groups[0].bucket.size.as_str(), "size18");
        assert_eq!(groups[1].bucket.size.as_str(), "size12");
        assert_eq!(groups[2].bucket.size.as_str(), "size24");
    }

    #[test]
    fn skips_garbage_keys_without_failing() {
        let id = Uuid::new_v4();
        let rec = record(
            id,
            json!({"fuerte_4kg_class1_size24": 500, "not-a-key": 3}),
            json!({"fuerte_4kg_class1_size24": 500, "also_bad": 9}),
        );
        let groups = derive_for_record(&rec, &HashMap::new());
        assert_eq!(groups.len(), 1);
    }
}
