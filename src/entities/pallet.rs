use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A consolidation of box batches of a single box format.
///
/// `total_boxes` is fixed at creation time and is the figure dissolution
/// must return exactly; pallet count and weight are derived, not stored.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub cold_room_id: Uuid,
    pub box_type: String,
    pub boxes_per_pallet: i32,
    pub total_boxes: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cold_room::Entity",
        from = "Column::ColdRoomId",
        to = "super::cold_room::Column::Id"
    )]
    ColdRoom,
    #[sea_orm(has_many = "super::cold_room_box::Entity")]
    ColdRoomBoxes,
}

impl Related<super::cold_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColdRoom.def()
    }
}

impl Related<super::cold_room_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColdRoomBoxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
