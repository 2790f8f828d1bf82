//! SeaORM implementation of LibrarianRepository

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::on_delete_error;
use crate::domain::{CreateLibrarianInput, DomainError, Librarian, LibrarianRepository};
use crate::models::librarian::{ActiveModel, Column, Entity as LibrarianEntity, Model};
use crate::models::{member, user};
use crate::utils::Clock;

pub struct SeaOrmLibrarianRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmLibrarianRepository {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    async fn details(
        &self,
        librarian: Model,
        member: Option<member::Model>,
    ) -> Result<Librarian, DomainError> {
        let member = match member {
            Some(m) => m,
            None => member::Entity::find_by_id(librarian.member_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| DomainError::not_found("Member", librarian.member_id))?,
        };
        let account = user::Entity::find_by_id(librarian.user_id)
            .one(&self.db)
            .await?;

        Ok(Librarian {
            member_id: librarian.member_id,
            since: librarian.since,
            user_id: librarian.user_id,
            username: account.map(|u| u.username),
            name: member.display_name(),
            national_id: member.national_id,
        })
    }
}

#[async_trait]
impl LibrarianRepository for SeaOrmLibrarianRepository {
    async fn find_all(&self) -> Result<Vec<Librarian>, DomainError> {
        let rows = LibrarianEntity::find()
            .find_also_related(member::Entity)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for (librarian, member) in rows {
            result.push(self.details(librarian, member).await?);
        }
        Ok(result)
    }

    async fn find_by_id(&self, member_id: i32) -> Result<Option<Librarian>, DomainError> {
        match LibrarianEntity::find_by_id(member_id).one(&self.db).await? {
            Some(librarian) => Ok(Some(self.details(librarian, None).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: i32) -> Result<Option<Librarian>, DomainError> {
        let found = LibrarianEntity::find()
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        match found {
            Some(librarian) => Ok(Some(self.details(librarian, None).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: CreateLibrarianInput) -> Result<Librarian, DomainError> {
        let member = member::Entity::find_by_id(input.member_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Member", input.member_id))?;

        if user::Entity::find_by_id(input.user_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("User", input.user_id));
        }

        let librarian = ActiveModel {
            member_id: Set(input.member_id),
            since: Set(self.clock.now()),
            user_id: Set(input.user_id),
        };

        let result = librarian
            .insert(&self.db)
            .await
            .map_err(|e| match DomainError::from(e) {
                DomainError::Duplicate(_) => DomainError::Duplicate(format!(
                    "member {} is already a librarian or user {} is already linked",
                    input.member_id, input.user_id
                )),
                other => other,
            })?;

        tracing::info!("Member {} onboarded as librarian", input.member_id);
        self.details(result, Some(member)).await
    }

    async fn delete(&self, member_id: i32) -> Result<(), DomainError> {
        let result = LibrarianEntity::delete_by_id(member_id)
            .exec(&self.db)
            .await
            .map_err(|e| {
                on_delete_error(e, || format!("librarian {} is recorded on loans", member_id))
            })?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Librarian", member_id));
        }

        Ok(())
    }
}
