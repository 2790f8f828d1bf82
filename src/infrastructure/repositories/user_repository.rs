//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::domain::{DomainError, UserRepository};
use crate::models::user::{ActiveModel, Column, Entity as UserEntity, Model};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, username: String) -> Result<Model, DomainError> {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::Validation("username must not be empty".into()));
        }

        let user = ActiveModel {
            username: Set(username.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        user.insert(&self.db)
            .await
            .map_err(|e| match DomainError::from(e) {
                DomainError::Duplicate(_) => {
                    DomainError::Duplicate(format!("username {} is taken", username))
                }
                other => other,
            })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(UserEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Model>, DomainError> {
        Ok(UserEntity::find()
            .filter(Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }
}
