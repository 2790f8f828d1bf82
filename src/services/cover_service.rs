//! Book covers: the uploaded file goes to the cover store and the returned
//! reference becomes the book's `cover`.

use crate::domain::{BookRepository, CoverStore, DomainError, UpdateBookInput};
use crate::models::Book;

/// Stores `bytes` as the cover of `isbn`, replacing (and deleting) any
/// previous cover file.
pub async fn set_cover(
    books: &dyn BookRepository,
    covers: &dyn CoverStore,
    isbn: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<Book, DomainError> {
    let book = books
        .find_by_isbn(isbn)
        .await?
        .ok_or_else(|| DomainError::not_found("Book", isbn))?;

    let reference = covers.store(file_name, bytes).await?;

    let update = UpdateBookInput {
        cover: Some(Some(reference.clone())),
        ..Default::default()
    };
    let updated = match books.update(isbn, update).await {
        Ok(updated) => updated,
        Err(e) => {
            // The book row was not touched, drop the orphan file
            if let Err(cleanup) = covers.remove(&reference).await {
                tracing::warn!("Could not remove orphan cover {}: {}", reference, cleanup);
            }
            return Err(e);
        }
    };

    if let Some(previous) = book.cover {
        discard(covers, &previous).await;
    }
    Ok(updated)
}

/// Detaches the cover of `isbn` and deletes its file.
pub async fn clear_cover(
    books: &dyn BookRepository,
    covers: &dyn CoverStore,
    isbn: &str,
) -> Result<Book, DomainError> {
    let book = books
        .find_by_isbn(isbn)
        .await?
        .ok_or_else(|| DomainError::not_found("Book", isbn))?;

    let updated = books
        .update(
            isbn,
            UpdateBookInput {
                cover: Some(None),
                ..Default::default()
            },
        )
        .await?;

    if let Some(previous) = book.cover {
        discard(covers, &previous).await;
    }
    Ok(updated)
}

// A missing old file is not worth failing the update for
async fn discard(covers: &dyn CoverStore, reference: &str) {
    match covers.remove(reference).await {
        Ok(()) => tracing::debug!("Removed old cover {}", reference),
        Err(e) => tracing::warn!("Could not remove old cover {}: {}", reference, e),
    }
}
