use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User account a librarian signs in with. Credentials live outside this crate.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::librarian::Entity")]
    Librarian,
}

impl Related<super::librarian::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Librarian.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
