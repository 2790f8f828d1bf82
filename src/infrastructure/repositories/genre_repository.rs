//! SeaORM implementation of GenreRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use validator::Validate;

use super::on_delete_error;
use crate::domain::{DomainError, GenreInput, GenreRepository};
use crate::models::genre::{ActiveModel, Column, Entity as GenreEntity, Model};

pub struct SeaOrmGenreRepository {
    db: DatabaseConnection,
}

impl SeaOrmGenreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn normalized(input: GenreInput) -> GenreInput {
    GenreInput {
        description: input.description.trim().to_string(),
    }
}

#[async_trait]
impl GenreRepository for SeaOrmGenreRepository {
    async fn find_all(&self) -> Result<Vec<Model>, DomainError> {
        Ok(GenreEntity::find()
            .order_by_asc(Column::Description)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(GenreEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: GenreInput) -> Result<Model, DomainError> {
        let input = normalized(input);
        input.validate()?;

        let genre = ActiveModel {
            description: Set(input.description),
            ..Default::default()
        };
        Ok(genre.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: GenreInput) -> Result<Model, DomainError> {
        let input = normalized(input);
        input.validate()?;

        let existing = GenreEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Genre", id))?;

        let mut active: ActiveModel = existing.into();
        active.description = Set(input.description);
        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = GenreEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| on_delete_error(e, || format!("genre {} is still used by books", id)))?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Genre", id));
        }

        Ok(())
    }
}
