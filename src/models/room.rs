use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{RoomStatus, RoomType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub building_id: i32,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    /// Cached count of active contracts. Written only by `services::occupancy`.
    pub current_occupancy: i32,
    pub price_per_month: f64,
    /// `full` iff occupancy >= capacity, unless the room is under `maintenance`.
    pub status: RoomStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::building::Entity",
        from = "Column::BuildingId",
        to = "super::building::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Building,
    #[sea_orm(has_many = "super::contract::Entity")]
    Contract,
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::building::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Building.def()
    }
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
