use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const ISBN_LENGTH: usize = 13;

/// Books are keyed by their ISBN-13. `total_copies` and `available_copies`
/// mirror the copy and loan tables and are only ever moved by the copy and
/// loan repositories.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub isbn: String,
    pub title: String,
    pub page_count: i32,
    pub total_copies: i32,
    pub available_copies: i32,
    pub genre_id: i32,
    pub cover: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::genre::Entity",
        from = "Column::GenreId",
        to = "super::genre::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Genre,
    #[sea_orm(has_many = "super::copy::Entity")]
    Copies,
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Genre.def()
    }
}

impl Related<super::copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copies.def()
    }
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_authors::Relation::Author.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_authors::Relation::Book.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Rejects anything that is not exactly 13 decimal digits.
pub fn validate_isbn13(value: &str) -> Result<(), DomainError> {
    if value.len() != ISBN_LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::Validation(format!(
            "ISBN must contain exactly 13 digits, \"{}\" is not valid",
            value
        )));
    }
    Ok(())
}

/// Groups an ISBN-13 as prefix-group-publisher-title-check (3-1-2-6-1).
pub fn format_isbn(isbn: &str) -> Option<String> {
    if validate_isbn13(isbn).is_err() {
        return None;
    }
    Some(format!(
        "{}-{}-{}-{}-{}",
        &isbn[0..3],
        &isbn[3..4],
        &isbn[4..6],
        &isbn[6..12],
        &isbn[12..]
    ))
}

// DTO for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub formatted_isbn: Option<String>,
    pub title: String,
    pub page_count: i32,
    pub total_copies: i32,
    pub available_copies: i32,
    pub genre_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        Self {
            formatted_isbn: format_isbn(&model.isbn),
            isbn: model.isbn,
            title: model.title,
            page_count: model.page_count,
            total_copies: model.total_copies,
            available_copies: model.available_copies,
            genre_id: model.genre_id,
            genre: None, // filled by the repository
            authors: Vec::new(),
            cover: model.cover,
        }
    }
}
