use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cold_rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cold_room_box::Entity")]
    ColdRoomBoxes,
    #[sea_orm(has_many = "super::pallet::Entity")]
    Pallets,
}

impl Related<super::cold_room_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColdRoomBoxes.def()
    }
}

impl Related<super::pallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
