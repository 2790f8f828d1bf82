//! Singleton configuration backed by the row with the reserved id.
//!
//! Writes are upserts on that id, so a second row can never appear: asking
//! to create one simply updates the existing row.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use validator::Validate;

use crate::domain::{ConfigurationInput, ConfigurationStore, DomainError};
use crate::models::Configuration;
use crate::models::configuration::{
    ActiveModel, Column, DEFAULT_GRACE_PERIOD_DAYS, DEFAULT_MAX_ACTIVE_LOANS, Entity, SINGLETON_ID,
};

pub struct SeaOrmConfigurationStore {
    db: DatabaseConnection,
}

impl SeaOrmConfigurationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Reads the singleton on any connection, inserting the defaults first if
/// the row is missing. Loans call this inside their own transaction.
pub(crate) async fn load_singleton<C: ConnectionTrait>(
    conn: &C,
) -> Result<Configuration, DomainError> {
    if let Some(row) = Entity::find_by_id(SINGLETON_ID).one(conn).await? {
        return Ok(row.into());
    }

    let defaults = ActiveModel {
        id: Set(SINGLETON_ID),
        grace_period_days: Set(DEFAULT_GRACE_PERIOD_DAYS),
        max_active_loans: Set(DEFAULT_MAX_ACTIVE_LOANS),
        updated_at: Set(chrono::Utc::now().to_rfc3339()),
    };
    Entity::insert(defaults)
        .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    Entity::find_by_id(SINGLETON_ID)
        .one(conn)
        .await?
        .map(Configuration::from)
        .ok_or_else(|| DomainError::Database("configuration row missing after insert".into()))
}

#[async_trait]
impl ConfigurationStore for SeaOrmConfigurationStore {
    async fn load(&self) -> Result<Configuration, DomainError> {
        load_singleton(&self.db).await
    }

    async fn save(&self, input: ConfigurationInput) -> Result<Configuration, DomainError> {
        input.validate()?;

        let row = ActiveModel {
            id: Set(SINGLETON_ID),
            grace_period_days: Set(input.grace_period_days),
            max_active_loans: Set(input.max_active_loans),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
        };
        Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::GracePeriodDays,
                        Column::MaxActiveLoans,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        tracing::info!(
            "Configuration saved: grace period {} days, max {} active loans",
            input.grace_period_days,
            input.max_active_loans
        );
        load_singleton(&self.db).await
    }
}
