use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One supplier delivery's classification result. Created by the counting
/// stage; this engine only reads the totals and the remaining-boxes
/// snapshot, and recomputes `has_remaining` after commits.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "counting_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub supplier_name: String,
    pub region: Option<String>,
    pub submitted_at: DateTimeUtc,
    /// Map of canonical bucket key -> originally counted quantity.
    pub counting_totals: Json,
    /// Map of bucket key -> quantity not yet loaded, as last reported by
    /// the counting stage. The authoritative remaining figure is this
    /// baseline reconciled against the balance ledger.
    pub remaining_boxes: Json,
    pub has_remaining: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cold_room_box::Entity")]
    ColdRoomBoxes,
}

impl Related<super::cold_room_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColdRoomBoxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
