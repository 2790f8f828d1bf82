//! SeaORM implementation of MemberRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use validator::Validate;

use super::on_delete_error;
use crate::domain::{DomainError, MemberInput, MemberRepository};
use crate::models::member::{ActiveModel, Column, Entity as MemberEntity, Model};

pub struct SeaOrmMemberRepository {
    db: DatabaseConnection,
}

impl SeaOrmMemberRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn duplicate_national_id(e: sea_orm::DbErr, national_id: &str) -> DomainError {
    match DomainError::from(e) {
        DomainError::Duplicate(_) => DomainError::Duplicate(format!(
            "a member with national id {} already exists",
            national_id
        )),
        other => other,
    }
}

fn apply(active: &mut ActiveModel, input: MemberInput) {
    active.national_id = Set(input.national_id.trim().to_string());
    active.first_name = Set(input.first_name);
    active.last_name = Set(input.last_name);
    active.email = Set(input.email);
    active.address = Set(input.address);
    active.mobile = Set(input.mobile.filter(|m| !m.is_empty()));
    active.phone = Set(input.phone.filter(|p| !p.is_empty()));
    active.birth_date = Set(input.birth_date);
}

#[async_trait]
impl MemberRepository for SeaOrmMemberRepository {
    async fn find_all(&self) -> Result<Vec<Model>, DomainError> {
        Ok(MemberEntity::find()
            .order_by_asc(Column::LastName)
            .order_by_asc(Column::FirstName)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(MemberEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Model>, DomainError> {
        Ok(MemberEntity::find()
            .filter(Column::NationalId.eq(national_id))
            .one(&self.db)
            .await?)
    }

    async fn create(&self, input: MemberInput) -> Result<Model, DomainError> {
        input.validate()?;

        let national_id = input.national_id.clone();
        let mut member = <ActiveModel as Default>::default();
        apply(&mut member, input);

        let result = member
            .insert(&self.db)
            .await
            .map_err(|e| duplicate_national_id(e, &national_id))?;

        tracing::info!("Member {} registered", result.id);
        Ok(result)
    }

    async fn update(&self, id: i32, input: MemberInput) -> Result<Model, DomainError> {
        input.validate()?;

        let existing = MemberEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Member", id))?;

        let national_id = input.national_id.clone();
        let mut active: ActiveModel = existing.into();
        apply(&mut active, input);

        Ok(active
            .update(&self.db)
            .await
            .map_err(|e| duplicate_national_id(e, &national_id))?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = MemberEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| {
                on_delete_error(e, || format!("member {} has loans or is a librarian", id))
            })?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Member", id));
        }

        Ok(())
    }
}
