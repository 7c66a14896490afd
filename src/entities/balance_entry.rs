use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::size_group::LoadingHistoryEntry;

/// Durable per-size-group balance: the system of record for how much of a
/// bucket has already been moved into cold storage. Keyed by the stable
/// unique key (counting record id + canonical bucket key).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub unique_key: String,
    pub counting_record_id: Uuid,
    pub loaded_quantity: i32,
    /// JSON array of [`LoadingHistoryEntry`], append-only.
    pub loading_history: Json,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Decoded history. Unreadable history degrades to empty rather than
    /// failing the derivation pass.
    pub fn history(&self) -> Vec<LoadingHistoryEntry> {
        serde_json::from_value(self.loading_history.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::counting_record::Entity",
        from = "Column::CountingRecordId",
        to = "super::counting_record::Column::Id"
    )]
    CountingRecord,
}

impl Related<super::counting_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CountingRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
