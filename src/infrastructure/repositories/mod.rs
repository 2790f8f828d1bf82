//! Repository implementations using SeaORM

pub mod author_repository;
mod book_counters;
pub mod book_repository;
pub mod configuration_store;
pub mod copy_repository;
pub mod genre_repository;
pub mod librarian_repository;
pub mod loan_repository;
pub mod member_repository;
pub mod user_repository;

pub use author_repository::SeaOrmAuthorRepository;
pub use book_repository::SeaOrmBookRepository;
pub use configuration_store::SeaOrmConfigurationStore;
pub use copy_repository::SeaOrmCopyRepository;
pub use genre_repository::SeaOrmGenreRepository;
pub use librarian_repository::SeaOrmLibrarianRepository;
pub use loan_repository::SeaOrmLoanRepository;
pub use member_repository::SeaOrmMemberRepository;
pub use user_repository::SeaOrmUserRepository;

use sea_orm::DbErr;

use crate::domain::DomainError;

/// Rewords a foreign-key failure on delete into a `Referenced` error that
/// names what still holds the row.
pub(crate) fn on_delete_error(e: DbErr, what: impl FnOnce() -> String) -> DomainError {
    match DomainError::from(e) {
        DomainError::Referenced(_) => {
            let msg = what();
            tracing::warn!("Refused delete: {}", msg);
            DomainError::Referenced(msg)
        }
        other => other,
    }
}
