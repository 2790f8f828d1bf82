//! SeaORM implementation of AuthorRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use validator::Validate;

use crate::domain::{Author, AuthorInput, AuthorRepository, DomainError};
use crate::models::author::{ActiveModel, Column, Entity as AuthorEntity, Model};

/// SeaORM-based implementation of AuthorRepository
pub struct SeaOrmAuthorRepository {
    db: DatabaseConnection,
}

impl SeaOrmAuthorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<Model> for Author {
    fn from(a: Model) -> Self {
        Self {
            display_name: a.display_name(),
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            pseudonym: a.pseudonym,
        }
    }
}

/// Empty strings are stored as NULL
fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl AuthorRepository for SeaOrmAuthorRepository {
    async fn find_all(&self) -> Result<Vec<Author>, DomainError> {
        let authors = AuthorEntity::find()
            .order_by_asc(Column::LastName)
            .order_by_asc(Column::Pseudonym)
            .all(&self.db)
            .await?;

        Ok(authors.into_iter().map(Author::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Author>, DomainError> {
        let author = AuthorEntity::find_by_id(id).one(&self.db).await?;
        Ok(author.map(Author::from))
    }

    async fn create(&self, input: AuthorInput) -> Result<Author, DomainError> {
        input.validate()?;
        let now = chrono::Utc::now().to_rfc3339();

        let author = ActiveModel {
            first_name: Set(blank_to_none(input.first_name)),
            last_name: Set(blank_to_none(input.last_name)),
            pseudonym: Set(blank_to_none(input.pseudonym)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = author.insert(&self.db).await?;
        Ok(result.into())
    }

    async fn update(&self, id: i32, input: AuthorInput) -> Result<Author, DomainError> {
        input.validate()?;

        let existing = AuthorEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Author", id))?;

        let mut active: ActiveModel = existing.into();
        active.first_name = Set(blank_to_none(input.first_name));
        active.last_name = Set(blank_to_none(input.last_name));
        active.pseudonym = Set(blank_to_none(input.pseudonym));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(result.into())
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = AuthorEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Author", id));
        }

        Ok(())
    }
}
