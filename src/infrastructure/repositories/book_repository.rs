//! SeaORM implementation of BookRepository

use std::collections::BTreeSet;

use async_trait::async_trait;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use validator::Validate;

use super::on_delete_error;
use crate::domain::{BookFilter, BookRepository, CreateBookInput, DomainError, UpdateBookInput};
use crate::models::book::{self, ActiveModel, Column, Entity as BookEntity, validate_isbn13};
use crate::models::{Book, author, book_authors, genre};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Converts to the DTO and attaches genre and author names
    async fn to_dto(&self, model: book::Model) -> Result<Book, DomainError> {
        let authors = model.find_related(author::Entity).all(&self.db).await?;
        let genre = model.find_related(genre::Entity).one(&self.db).await?;

        let mut dto = Book::from(model);
        dto.genre = genre.map(|g| g.description);
        dto.authors = authors.iter().map(author::Model::display_name).collect();
        Ok(dto)
    }
}

async fn ensure_genre<C: ConnectionTrait>(conn: &C, genre_id: i32) -> Result<(), DomainError> {
    genre::Entity::find_by_id(genre_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| DomainError::not_found("Genre", genre_id))
}

/// Replaces the author links of a book
async fn link_authors<C: ConnectionTrait>(
    conn: &C,
    isbn: &str,
    author_ids: &[i32],
) -> Result<(), DomainError> {
    let ids: BTreeSet<i32> = author_ids.iter().copied().collect();

    if !ids.is_empty() {
        let found = author::Entity::find()
            .filter(author::Column::Id.is_in(ids.iter().copied()))
            .count(conn)
            .await?;
        if found != ids.len() as u64 {
            return Err(DomainError::NotFound(format!(
                "one or more authors in {:?} not found",
                ids
            )));
        }
    }

    book_authors::Entity::delete_many()
        .filter(book_authors::Column::BookIsbn.eq(isbn))
        .exec(conn)
        .await?;

    if ids.is_empty() {
        return Ok(());
    }

    let links = ids.into_iter().map(|author_id| book_authors::ActiveModel {
        book_isbn: Set(isbn.to_string()),
        author_id: Set(author_id),
    });
    book_authors::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_all(&self, filter: BookFilter) -> Result<Vec<Book>, DomainError> {
        let mut query = BookEntity::find();

        // Apply filters
        if let Some(genre_id) = filter.genre_id {
            query = query.filter(Column::GenreId.eq(genre_id));
        }

        if let Some(title) = &filter.title
            && !title.is_empty()
        {
            query = query.filter(Column::Title.contains(title));
        }

        if let Some(author_id) = filter.author_id {
            query = query.filter(
                Column::Isbn.in_subquery(
                    Query::select()
                        .column(book_authors::Column::BookIsbn)
                        .from(book_authors::Entity)
                        .and_where(book_authors::Column::AuthorId.eq(author_id))
                        .to_owned(),
                ),
            );
        }

        if filter.available_only {
            query = query.filter(Column::AvailableCopies.gt(0));
        }

        let books = query.order_by_asc(Column::Title).all(&self.db).await?;

        let mut dtos = Vec::with_capacity(books.len());
        for model in books {
            dtos.push(self.to_dto(model).await?);
        }
        Ok(dtos)
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, DomainError> {
        let found = BookEntity::find_by_id(isbn.to_string())
            .one(&self.db)
            .await?;
        match found {
            Some(model) => Ok(Some(self.to_dto(model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: CreateBookInput) -> Result<Book, DomainError> {
        validate_isbn13(&input.isbn)?;
        input.validate()?;

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.db.begin().await?;

        ensure_genre(&txn, input.genre_id).await?;

        let new_book = ActiveModel {
            isbn: Set(input.isbn.clone()),
            title: Set(input.title),
            page_count: Set(input.page_count),
            total_copies: Set(0),
            available_copies: Set(0),
            genre_id: Set(input.genre_id),
            cover: Set(input.cover),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };
        new_book.insert(&txn).await?;
        link_authors(&txn, &input.isbn, &input.author_ids).await?;

        txn.commit().await?;
        tracing::info!("Book {} added to the catalog", input.isbn);

        self.find_by_isbn(&input.isbn)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", &input.isbn))
    }

    async fn update(&self, isbn: &str, input: UpdateBookInput) -> Result<Book, DomainError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let existing = BookEntity::find_by_id(isbn.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", isbn))?;

        let mut active: ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(page_count) = input.page_count {
            active.page_count = Set(page_count);
        }
        if let Some(genre_id) = input.genre_id {
            ensure_genre(&txn, genre_id).await?;
            active.genre_id = Set(genre_id);
        }
        if let Some(cover) = input.cover {
            active.cover = Set(cover);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&txn).await?;

        if let Some(author_ids) = input.author_ids {
            link_authors(&txn, isbn, &author_ids).await?;
        }

        txn.commit().await?;

        self.find_by_isbn(isbn)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", isbn))
    }

    async fn delete(&self, isbn: &str) -> Result<(), DomainError> {
        let result = BookEntity::delete_by_id(isbn.to_string())
            .exec(&self.db)
            .await
            .map_err(|e| on_delete_error(e, || format!("book {} has copies with loans", isbn)))?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Book", isbn));
        }

        tracing::info!("Book {} removed from the catalog", isbn);
        Ok(())
    }
}
