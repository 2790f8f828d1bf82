use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub copy_id: i32,
    pub member_id: i32,
    pub issued_by: i32,
    pub received_by: Option<i32>,
    pub loan_date: Date,
    pub due_date: Date,
    pub return_date: Option<Date>,
    pub created_at: String,
    pub updated_at: String,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, today: Date) -> bool {
        self.is_pending() && self.due_date < today
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::copy::Entity",
        from = "Column::CopyId",
        to = "super::copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Copy,
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Member,
    #[sea_orm(
        belongs_to = "super::librarian::Entity",
        from = "Column::IssuedBy",
        to = "super::librarian::Column::MemberId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    IssuedBy,
    #[sea_orm(
        belongs_to = "super::librarian::Entity",
        from = "Column::ReceivedBy",
        to = "super::librarian::Column::MemberId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    ReceivedBy,
}

impl Related<super::copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copy.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
