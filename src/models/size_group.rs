use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::bucket::BucketKey;

/// One committed load against a size-group, kept append-only in the
/// balance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadingHistoryEntry {
    pub quantity: i32,
    pub cold_room_id: Uuid,
    pub at: DateTime<Utc>,
}

/// The unit of work for loading: one bucket of one counting record,
/// together with its reconciled balance.
///
/// Rebuilt on every derivation pass from the counting record plus the
/// persisted ledger entry; never the system of record itself.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SizeGroup {
    /// Stable key: counting record id + canonical bucket key.
    pub unique_key: String,
    pub counting_record_id: Uuid,
    pub supplier_name: String,
    pub bucket: BucketKey,
    /// Originally counted quantity for this bucket.
    pub total_quantity: i32,
    /// Sum of all committed loads, from the ledger.
    pub loaded_quantity: i32,
    /// `max(0, total - loaded)`.
    pub remaining_quantity: i32,
    pub loading_history: Vec<LoadingHistoryEntry>,
}

impl SizeGroup {
    pub fn from_balance(
        counting_record_id: Uuid,
        supplier_name: &str,
        bucket: BucketKey,
        total_quantity: i32,
        loaded_quantity: i32,
        loading_history: Vec<LoadingHistoryEntry>,
    ) -> Self {
        let unique_key = bucket.unique_key(counting_record_id);
        Self {
            unique_key,
            counting_record_id,
            supplier_name: supplier_name.to_string(),
            bucket,
            total_quantity,
            loaded_quantity,
            remaining_quantity: (total_quantity - loaded_quantity).max(0),
            loading_history,
        }
    }

    /// A group is offered for loading only while something is left and the
    /// original count is known (stale keys derive with total 0).
    pub fn is_loadable(&self) -> bool {
        self.total_quantity > 0 && self.remaining_quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bucket::BucketKey;

    fn bucket() -> BucketKey {
        BucketKey::parse("fuerte_4kg_class1_size24").unwrap()
    }

    #[test]
    fn remaining_is_clamped_at_zero() {
        let group = SizeGroup::from_balance(Uuid::new_v4(), "Acme Farms", bucket(), 100, 150, vec![]);
        assert_eq!(group.remaining_quantity, 0);
        assert!(!group.is_loadable());
    }

    #[test]
    fn balance_conserves_total() {
        let group = SizeGroup::from_balance(Uuid::new_v4(), "Acme Farms", bucket(), 500, 200, vec![]);
        assert_eq!(group.loaded_quantity + group.remaining_quantity, group.total_quantity);
        assert!(group.is_loadable());
    }

    #[test]
    fn stale_key_with_zero_total_never_loadable() {
        let group = SizeGroup::from_balance(Uuid::new_v4(), "Acme Farms", bucket(), 0, 0, vec![]);
        assert!(!group.is_loadable());
    }
}
