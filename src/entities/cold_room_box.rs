use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::bucket::{BucketKey, BucketKeyParseError, SizeKey};

/// A physical batch of boxes sitting in a cold room.
///
/// Written by the load committer (one row per committed size-group load),
/// split/linked by pallet consolidation and merged back by dissolution.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cold_room_boxes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variety: String,
    pub box_type: String,
    pub grade: String,
    pub size: String,
    pub quantity: i32,
    pub cold_room_id: Uuid,
    pub supplier_name: String,
    pub source_counting_record_id: Uuid,
    pub is_in_pallet: bool,
    pub pallet_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Typed bucket identity of this batch. Rows are only ever written
    /// from a parsed `BucketKey`, so failure here means corrupted data.
    pub fn bucket(&self) -> Result<BucketKey, BucketKeyParseError> {
        Ok(BucketKey {
            variety: self.variety.clone(),
            box_type: self.box_type.parse()?,
            grade: self.grade.clone(),
            size: SizeKey::parse(&self.size)?,
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cold_room::Entity",
        from = "Column::ColdRoomId",
        to = "super::cold_room::Column::Id"
    )]
    ColdRoom,
    #[sea_orm(
        belongs_to = "super::counting_record::Entity",
        from = "Column::SourceCountingRecordId",
        to = "super::counting_record::Column::Id"
    )]
    CountingRecord,
    #[sea_orm(
        belongs_to = "super::pallet::Entity",
        from = "Column::PalletId",
        to = "super::pallet::Column::Id"
    )]
    Pallet,
}

impl Related<super::cold_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColdRoom.def()
    }
}

impl Related<super::counting_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CountingRecord.def()
    }
}

impl Related<super::pallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
