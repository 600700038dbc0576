use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Gender, StudentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub student_code: Option<String>,
    pub full_name: String,
    pub gender: Gender,
    pub email: String,
    pub phone: Option<String>,
    /// Valid values:
    /// - `pending`: registered, awaiting admin approval
    /// - `active`: approved, or implicitly activated by a contract
    /// - `inactive`: rejected or deactivated
    /// - `blocked`: suspended by an admin
    pub status: StudentStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::contract::Entity")]
    Contract,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
