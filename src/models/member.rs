use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Date,
}

impl Model {
    /// "Surname, Given"
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::librarian::Entity")]
    Librarian,
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::librarian::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Librarian.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
