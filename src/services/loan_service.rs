//! Loan Service - desk workflows and enriched loan listings

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::domain::{DomainError, LoanFilter, LoanRepository, UpdateLoanInput};
use crate::models::book::Entity as Book;
use crate::models::copy::{self, Entity as Copy, copy_label};
use crate::models::loan;
use crate::models::member::Entity as Member;

/// Enriched loan with related data
#[derive(Debug, Clone, Serialize)]
pub struct LoanWithDetails {
    pub id: i32,
    pub copy_id: i32,
    pub copy_label: String,
    pub book_isbn: String,
    pub member_id: i32,
    pub member_name: String,
    pub issued_by: i32,
    pub received_by: Option<i32>,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub overdue: bool,
}

/// Lists loans matching the filter with member and book info
pub async fn list_loans(
    db: &DatabaseConnection,
    loans: &dyn LoanRepository,
    filter: LoanFilter,
    today: NaiveDate,
) -> Result<Vec<LoanWithDetails>, DomainError> {
    let rows = loans.find_all(filter).await?;

    let copy_ids: Vec<i32> = rows.iter().map(|l| l.copy_id).collect();
    let member_ids: Vec<i32> = rows.iter().map(|l| l.member_id).collect();

    // Fetch copies with books
    let mut copy_map: HashMap<i32, (String, String)> = HashMap::new();
    if !copy_ids.is_empty() {
        let copies_with_books = Copy::find()
            .filter(copy::Column::Id.is_in(copy_ids))
            .find_also_related(Book)
            .all(db)
            .await?;

        for (copy, book) in copies_with_books {
            let title = book.map(|b| b.title).unwrap_or_else(|| "Unknown".to_string());
            copy_map.insert(copy.id, (copy_label(copy.copy_number, &title), copy.book_isbn));
        }
    }

    let mut member_map: HashMap<i32, String> = HashMap::new();
    if !member_ids.is_empty() {
        let members = Member::find()
            .filter(crate::models::member::Column::Id.is_in(member_ids))
            .all(db)
            .await?;
        for m in members {
            member_map.insert(m.id, m.display_name());
        }
    }

    Ok(rows
        .into_iter()
        .map(|l: loan::Model| {
            let (label, book_isbn) = copy_map
                .get(&l.copy_id)
                .cloned()
                .unwrap_or_else(|| ("Unknown".to_string(), String::new()));
            LoanWithDetails {
                overdue: l.is_overdue(today),
                member_name: member_map
                    .get(&l.member_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                id: l.id,
                copy_id: l.copy_id,
                copy_label: label,
                book_isbn,
                member_id: l.member_id,
                issued_by: l.issued_by,
                received_by: l.received_by,
                loan_date: l.loan_date,
                due_date: l.due_date,
                return_date: l.return_date,
            }
        })
        .collect())
}

/// A librarian takes a copy back at the desk. The return date is stamped by
/// the repository in the same save.
pub async fn receive_return(
    loans: &dyn LoanRepository,
    loan_id: i32,
    librarian_id: i32,
) -> Result<loan::Model, DomainError> {
    let loan = loans
        .find_by_id(loan_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Loan", loan_id))?;

    if !loan.is_pending() {
        return Err(DomainError::BusinessRule(format!(
            "loan {} is already returned",
            loan_id
        )));
    }

    loans
        .update(
            loan_id,
            UpdateLoanInput {
                received_by: Some(librarian_id),
                ..Default::default()
            },
        )
        .await
}

/// Pending loans past their due date on `today`
pub async fn overdue_loans(
    loans: &dyn LoanRepository,
    today: NaiveDate,
) -> Result<Vec<loan::Model>, DomainError> {
    loans
        .find_all(LoanFilter {
            overdue_on: Some(today),
            ..Default::default()
        })
        .await
}
