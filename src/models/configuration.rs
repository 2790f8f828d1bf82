use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The only id the configuration table accepts.
pub const SINGLETON_ID: i32 = 1;
pub const DEFAULT_GRACE_PERIOD_DAYS: i32 = 3;
pub const DEFAULT_MAX_ACTIVE_LOANS: i32 = 3;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Days a loan may stay out, counted from the day it is issued
    pub grace_period_days: i32,
    pub max_active_loans: i32,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// DTO for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub grace_period_days: i32,
    pub max_active_loans: i32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            max_active_loans: DEFAULT_MAX_ACTIVE_LOANS,
        }
    }
}

impl From<Model> for Configuration {
    fn from(model: Model) -> Self {
        Self {
            grace_period_days: model.grace_period_days,
            max_active_loans: model.max_active_loans,
        }
    }
}
