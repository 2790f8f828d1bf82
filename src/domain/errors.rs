//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! Store failures are classified on conversion so callers can tell a bad
//! value from a duplicate key or a protected reference.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Invalid field value, the message includes the offending input
    #[error("Invalid field value: {0}")]
    Validation(String),
    /// Uniqueness constraint violated
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    /// Referential-integrity violation on delete
    #[error("Referenced entity cannot be removed: {0}")]
    Referenced(String),
    /// Operation rejected by a lending or inventory rule
    #[error("Business rule violation: {0}")]
    BusinessRule(String),
    /// Cover storage failure
    #[error("Storage error: {0}")]
    Storage(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        DomainError::NotFound(format!("{} {} not found", entity, key))
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => return DomainError::Duplicate(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return DomainError::Referenced(msg);
            }
            _ => {}
        }

        // The driver does not always report an extended result code
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint failed") {
            DomainError::Duplicate(msg)
        } else if msg.contains("FOREIGN KEY constraint failed") {
            DomainError::Referenced(msg)
        } else if msg.contains("CHECK constraint failed") {
            DomainError::BusinessRule(format!("inventory counters out of range ({})", msg))
        } else {
            DomainError::Database(msg)
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(e: validator::ValidationErrors) -> Self {
        DomainError::Validation(e.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}
