//! SeaORM implementation of CopyRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{book_counters, on_delete_error};
use crate::domain::{Copy, CopyRepository, CreateCopyInput, DomainError};
use crate::models::book::Entity as BookEntity;
use crate::models::copy::{ActiveModel, Column, Entity as CopyEntity, Model, copy_label};

/// SeaORM-based implementation of CopyRepository
pub struct SeaOrmCopyRepository {
    db: DatabaseConnection,
}

impl SeaOrmCopyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_copy(copy: Model, title: Option<&str>) -> Copy {
    Copy {
        label: title.map(|t| copy_label(copy.copy_number, t)),
        id: copy.id,
        book_isbn: copy.book_isbn,
        copy_number: copy.copy_number,
    }
}

/// `MAX(copy_number)` for the book, 0 for a book without copies
pub(crate) async fn max_copy_number<C: ConnectionTrait>(
    conn: &C,
    isbn: &str,
) -> Result<i32, DomainError> {
    let max: Option<Option<i32>> = CopyEntity::find()
        .select_only()
        .column_as(Column::CopyNumber.max(), "max_number")
        .filter(Column::BookIsbn.eq(isbn))
        .into_tuple()
        .one(conn)
        .await?;

    Ok(max.flatten().unwrap_or(0))
}

#[async_trait]
impl CopyRepository for SeaOrmCopyRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Copy>, DomainError> {
        let result = CopyEntity::find_by_id(id)
            .find_also_related(BookEntity)
            .one(&self.db)
            .await?;

        Ok(result.map(|(copy, book)| to_copy(copy, book.as_ref().map(|b| b.title.as_str()))))
    }

    async fn find_by_book(&self, isbn: &str) -> Result<Vec<Copy>, DomainError> {
        let copies = CopyEntity::find()
            .filter(Column::BookIsbn.eq(isbn))
            .order_by_asc(Column::CopyNumber)
            .find_also_related(BookEntity)
            .all(&self.db)
            .await?;

        Ok(copies
            .into_iter()
            .map(|(copy, book)| to_copy(copy, book.as_ref().map(|b| b.title.as_str())))
            .collect())
    }

    async fn max_copy_number(&self, isbn: &str) -> Result<i32, DomainError> {
        max_copy_number(&self.db, isbn).await
    }

    async fn create(&self, input: CreateCopyInput) -> Result<Copy, DomainError> {
        if let Some(n) = input.copy_number
            && n < 1
        {
            return Err(DomainError::Validation(format!(
                "copy number must be positive, got {}",
                n
            )));
        }

        let txn = self.db.begin().await?;

        // Writing the parent row first serializes concurrent creations for
        // the same book before the MAX read below.
        if book_counters::adjust(&txn, &input.book_isbn, 1, 1).await? == 0 {
            return Err(DomainError::not_found("Book", &input.book_isbn));
        }

        let copy_number = match input.copy_number {
            Some(n) => n,
            None => max_copy_number(&txn, &input.book_isbn).await? + 1,
        };

        let new_copy = ActiveModel {
            book_isbn: Set(input.book_isbn.clone()),
            copy_number: Set(copy_number),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        let result = new_copy
            .insert(&txn)
            .await
            .map_err(|e| match DomainError::from(e) {
                DomainError::Duplicate(_) => DomainError::Duplicate(format!(
                    "copy {} of book {} already exists",
                    copy_number, input.book_isbn
                )),
                other => other,
            })?;

        let book = BookEntity::find_by_id(input.book_isbn.clone())
            .one(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!("Copy {} of book {} created", copy_number, input.book_isbn);
        Ok(to_copy(result, book.as_ref().map(|b| b.title.as_str())))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let txn = self.db.begin().await?;

        let copy = CopyEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Copy", id))?;

        CopyEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| on_delete_error(e, || format!("copy {} has loans", id)))?;

        book_counters::adjust(&txn, &copy.book_isbn, -1, -1).await?;
        txn.commit().await?;

        tracing::info!("Copy {} of book {} deleted", copy.copy_number, copy.book_isbn);
        Ok(())
    }
}
