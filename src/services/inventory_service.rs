//! Inventory audit: recounts every book's copies from the rows that drive
//! the counters and compares them with the stored values.
//!
//! total     = number of copies
//! available = copies - copies with a pending loan

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{book, copy, loan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryDiscrepancy {
    pub isbn: String,
    pub stored_total: i32,
    pub stored_available: i32,
    pub counted_total: i32,
    pub counted_available: i32,
}

struct Recount {
    total: i32,
    available: i32,
}

async fn recount<C: ConnectionTrait>(db: &C) -> Result<HashMap<String, Recount>, DomainError> {
    let copies = copy::Entity::find().all(db).await?;
    let pending = loan::Entity::find()
        .filter(loan::Column::ReturnDate.is_null())
        .all(db)
        .await?;

    let out: HashSet<i32> = pending.iter().map(|l| l.copy_id).collect();

    let mut counts: HashMap<String, Recount> = HashMap::new();
    for c in copies {
        let entry = counts.entry(c.book_isbn).or_insert(Recount {
            total: 0,
            available: 0,
        });
        entry.total += 1;
        if !out.contains(&c.id) {
            entry.available += 1;
        }
    }
    Ok(counts)
}

/// Books whose stored counters disagree with the copy and loan tables
pub async fn audit(db: &DatabaseConnection) -> Result<Vec<InventoryDiscrepancy>, DomainError> {
    let counts = recount(db).await?;
    let books = book::Entity::find()
        .order_by_asc(book::Column::Isbn)
        .all(db)
        .await?;

    let discrepancies: Vec<InventoryDiscrepancy> = books
        .into_iter()
        .filter_map(|b| {
            let (total, available) = counts
                .get(&b.isbn)
                .map(|r| (r.total, r.available))
                .unwrap_or((0, 0));
            (b.total_copies != total || b.available_copies != available).then(|| {
                InventoryDiscrepancy {
                    isbn: b.isbn,
                    stored_total: b.total_copies,
                    stored_available: b.available_copies,
                    counted_total: total,
                    counted_available: available,
                }
            })
        })
        .collect();

    if discrepancies.is_empty() {
        tracing::debug!("Inventory audit clean");
    } else {
        tracing::warn!("Inventory audit found {} discrepancies", discrepancies.len());
    }
    Ok(discrepancies)
}

/// Rewrites the counters of every inconsistent book from a fresh recount.
/// Returns the discrepancies that were fixed.
pub async fn repair(db: &DatabaseConnection) -> Result<Vec<InventoryDiscrepancy>, DomainError> {
    let found = audit(db).await?;
    if found.is_empty() {
        return Ok(found);
    }

    let txn = db.begin().await?;
    for d in &found {
        book::Entity::update_many()
            .col_expr(book::Column::TotalCopies, Expr::value(d.counted_total))
            .col_expr(book::Column::AvailableCopies, Expr::value(d.counted_available))
            .filter(book::Column::Isbn.eq(d.isbn.as_str()))
            .exec(&txn)
            .await?;
        tracing::info!(
            "Book {} counters reset to {}/{}",
            d.isbn,
            d.counted_available,
            d.counted_total
        );
    }
    txn.commit().await?;

    Ok(found)
}
