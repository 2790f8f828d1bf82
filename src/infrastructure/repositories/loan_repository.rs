//! SeaORM implementation of LoanRepository
//!
//! Issuing and returning a loan move the book's `available_copies` inside the
//! same transaction as the loan row itself:
//! - a loan created without a return date takes the copy off the shelf (-1);
//! - the first save that gives a loan a return date puts it back (+1);
//! - a loan created already returned leaves the counter alone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::book_counters;
use super::configuration_store::load_singleton;
use crate::domain::{CreateLoanInput, DomainError, LoanFilter, LoanRepository, UpdateLoanInput};
use crate::models::loan::{ActiveModel, Column, Entity as LoanEntity, Model};
use crate::models::{copy, librarian, member};
use crate::utils::Clock;

pub struct SeaOrmLoanRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmLoanRepository {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

async fn ensure_librarian<C>(conn: &C, member_id: i32) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    librarian::Entity::find_by_id(member_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| DomainError::not_found("Librarian", member_id))
}

async fn count_pending<C>(conn: &C, filter: SimpleExpr) -> Result<u64, DomainError>
where
    C: ConnectionTrait,
{
    Ok(LoanEntity::find()
        .filter(Column::ReturnDate.is_null())
        .filter(filter)
        .count(conn)
        .await?)
}

/// Book behind a copy, needed to move its counters
async fn book_of_copy<C: ConnectionTrait>(conn: &C, copy_id: i32) -> Result<String, DomainError> {
    copy::Entity::find_by_id(copy_id)
        .one(conn)
        .await?
        .map(|c| c.book_isbn)
        .ok_or_else(|| DomainError::not_found("Copy", copy_id))
}

/// Decides the return date a save ends up with. `None` means still pending.
fn resolve_return_date(
    current: Option<NaiveDate>,
    requested: Option<NaiveDate>,
    received_by: Option<i32>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    current.or(requested).or(received_by.map(|_| today))
}

/// `today` plus the grace period, rejecting periods the calendar cannot hold.
fn default_due_date(today: NaiveDate, grace_period_days: i32) -> Result<NaiveDate, DomainError> {
    u64::try_from(grace_period_days)
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            DomainError::BusinessRule(format!(
                "grace period of {} days does not give a valid due date",
                grace_period_days
            ))
        })
}

#[async_trait]
impl LoanRepository for SeaOrmLoanRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(LoanEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_all(&self, filter: LoanFilter) -> Result<Vec<Model>, DomainError> {
        let mut condition = Condition::all();

        if let Some(member_id) = filter.member_id {
            condition = condition.add(Column::MemberId.eq(member_id));
        }

        if let Some(copy_id) = filter.copy_id {
            condition = condition.add(Column::CopyId.eq(copy_id));
        }

        if filter.pending_only || filter.overdue_on.is_some() {
            condition = condition.add(Column::ReturnDate.is_null());
        }

        if let Some(day) = filter.overdue_on {
            condition = condition.add(Column::DueDate.lt(day));
        }

        Ok(LoanEntity::find()
            .filter(condition)
            .order_by_asc(Column::DueDate)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn count_pending_for_member(&self, member_id: i32) -> Result<u64, DomainError> {
        let filter = Column::MemberId.eq(member_id);
        count_pending(&self.db, filter).await
    }

    async fn create(&self, input: CreateLoanInput) -> Result<Model, DomainError> {
        let today = self.clock.today();
        let txn = self.db.begin().await?;

        let config = load_singleton(&txn).await?;
        let isbn = book_of_copy(&txn, input.copy_id).await?;

        if member::Entity::find_by_id(input.member_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Member", input.member_id));
        }
        ensure_librarian(&txn, input.issued_by).await?;
        if let Some(received_by) = input.received_by {
            ensure_librarian(&txn, received_by).await?;
        }

        let return_date = resolve_return_date(None, input.return_date, input.received_by, today);

        if return_date.is_none() {
            let on_copy = Column::CopyId.eq(input.copy_id);
            let copy_out = count_pending(&txn, on_copy).await?;
            if copy_out > 0 {
                tracing::warn!("Copy {} requested while already on loan", input.copy_id);
                return Err(DomainError::BusinessRule(format!(
                    "copy {} is already on loan",
                    input.copy_id
                )));
            }

            let of_member = Column::MemberId.eq(input.member_id);
            let active = count_pending(&txn, of_member).await?;
            if active >= config.max_active_loans as u64 {
                tracing::warn!(
                    "Member {} reached the limit of {} active loans",
                    input.member_id,
                    config.max_active_loans
                );
                return Err(DomainError::BusinessRule(format!(
                    "member {} already has {} active loans (max {})",
                    input.member_id, active, config.max_active_loans
                )));
            }
        }

        let due_date = match input.due_date {
            Some(due_date) => due_date,
            None => default_due_date(today, config.grace_period_days)?,
        };

        let now = self.clock.now().to_rfc3339();
        let new_loan = ActiveModel {
            copy_id: Set(input.copy_id),
            member_id: Set(input.member_id),
            issued_by: Set(input.issued_by),
            received_by: Set(input.received_by),
            loan_date: Set(today),
            due_date: Set(due_date),
            return_date: Set(return_date),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = new_loan.insert(&txn).await?;

        // Issued and returned in the same save: the copy never left
        if return_date.is_none() {
            book_counters::adjust(&txn, &isbn, 0, -1).await?;
        }

        txn.commit().await?;
        tracing::info!(
            "Loan {} issued: copy {} to member {}, due {}",
            saved.id,
            saved.copy_id,
            saved.member_id,
            saved.due_date
        );
        Ok(saved)
    }

    async fn update(&self, id: i32, input: UpdateLoanInput) -> Result<Model, DomainError> {
        let today = self.clock.today();
        let txn = self.db.begin().await?;

        let existing = LoanEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Loan", id))?;

        if let (Some(current), Some(requested)) = (existing.return_date, input.return_date)
            && current != requested
        {
            return Err(DomainError::BusinessRule(format!(
                "loan {} was already returned on {}",
                id, current
            )));
        }

        if let Some(received_by) = input.received_by {
            ensure_librarian(&txn, received_by).await?;
        }

        let received_by = input.received_by.or(existing.received_by);
        let return_date =
            resolve_return_date(existing.return_date, input.return_date, received_by, today);
        let just_returned = existing.return_date.is_none() && return_date.is_some();

        let copy_id = existing.copy_id;
        let mut active: ActiveModel = existing.into();
        active.received_by = Set(received_by);
        active.return_date = Set(return_date);
        if let Some(due_date) = input.due_date {
            active.due_date = Set(due_date);
        }
        active.updated_at = Set(self.clock.now().to_rfc3339());
        let saved = active.update(&txn).await?;

        if just_returned {
            let isbn = book_of_copy(&txn, copy_id).await?;
            book_counters::adjust(&txn, &isbn, 0, 1).await?;
        }

        txn.commit().await?;
        if just_returned {
            tracing::info!("Loan {} returned on {}", id, saved.return_date.unwrap_or(today));
        }
        Ok(saved)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let txn = self.db.begin().await?;

        let existing = LoanEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Loan", id))?;

        LoanEntity::delete_by_id(id).exec(&txn).await?;

        // A pending loan being discarded puts its copy back on the shelf
        if existing.is_pending() {
            let isbn = book_of_copy(&txn, existing.copy_id).await?;
            book_counters::adjust(&txn, &isbn, 0, 1).await?;
        }

        txn.commit().await?;
        tracing::info!("Loan {} deleted", id);
        Ok(())
    }
}
