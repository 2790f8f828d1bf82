use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One physical copy of a book. `copy_number` is sequential per book and the
/// (book_isbn, copy_number) pair is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "copies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_isbn: String,
    pub copy_number: i32,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookIsbn",
        to = "super::book::Column::Isbn",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Book,
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// "<copy-number>-<title>", the label printed on the copy.
pub fn copy_label(copy_number: i32, title: &str) -> String {
    format!("{}-{}", copy_number, title)
}
