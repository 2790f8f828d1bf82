//! Atomic adjustments of a book's copy counters.
//!
//! Every change is a single `UPDATE books SET x = x + n` executed on the
//! caller's transaction, so concurrent writers never lose an update and the
//! counter moves together with the row that caused it.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::models::book::{Column, Entity as BookEntity};

/// Shifts `total_copies` and `available_copies` by the given deltas.
/// Returns the number of book rows touched (0 when the ISBN is unknown).
pub(crate) async fn adjust<C: ConnectionTrait>(
    conn: &C,
    isbn: &str,
    total_delta: i32,
    available_delta: i32,
) -> Result<u64, DbErr> {
    let mut update = BookEntity::update_many().filter(Column::Isbn.eq(isbn));

    if total_delta != 0 {
        update = update.col_expr(
            Column::TotalCopies,
            Expr::col(Column::TotalCopies).add(total_delta),
        );
    }
    // Written even when unchanged so the parent row is always locked
    update = update.col_expr(
        Column::AvailableCopies,
        Expr::col(Column::AvailableCopies).add(available_delta),
    );

    let result = update.exec(conn).await?;
    tracing::debug!(
        "Book {} counters adjusted (total {:+}, available {:+})",
        isbn,
        total_delta,
        available_delta
    );
    Ok(result.rows_affected)
}
