//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{
    AuthorRepository, BookRepository, ConfigurationStore, CopyRepository, CoverStore,
    GenreRepository, LibrarianRepository, LoanRepository, MemberRepository, UserRepository,
};
use crate::infrastructure::{
    LocalCoverStore, SeaOrmAuthorRepository, SeaOrmBookRepository, SeaOrmConfigurationStore,
    SeaOrmCopyRepository, SeaOrmGenreRepository, SeaOrmLibrarianRepository, SeaOrmLoanRepository,
    SeaOrmMemberRepository, SeaOrmUserRepository,
};
use crate::utils::{Clock, SystemClock};

/// Every repository of the library, wired to one database
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub users: Arc<dyn UserRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub genres: Arc<dyn GenreRepository>,
    pub books: Arc<dyn BookRepository>,
    pub copies: Arc<dyn CopyRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub librarians: Arc<dyn LibrarianRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub configuration: Arc<dyn ConfigurationStore>,
    pub covers: Arc<dyn CoverStore>,
}

impl AppState {
    /// Create a new AppState on the wall clock, covers under `media_root`
    pub fn new(db: DatabaseConnection, media_root: impl Into<std::path::PathBuf>) -> Self {
        Self::with_clock(db, media_root, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: DatabaseConnection,
        media_root: impl Into<std::path::PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: Arc::new(SeaOrmUserRepository::new(db.clone())),
            authors: Arc::new(SeaOrmAuthorRepository::new(db.clone())),
            genres: Arc::new(SeaOrmGenreRepository::new(db.clone())),
            books: Arc::new(SeaOrmBookRepository::new(db.clone())),
            copies: Arc::new(SeaOrmCopyRepository::new(db.clone())),
            members: Arc::new(SeaOrmMemberRepository::new(db.clone())),
            librarians: Arc::new(SeaOrmLibrarianRepository::new(db.clone(), clock.clone())),
            loans: Arc::new(SeaOrmLoanRepository::new(db.clone(), clock)),
            configuration: Arc::new(SeaOrmConfigurationStore::new(db.clone())),
            covers: Arc::new(LocalCoverStore::new(media_root)),
            db,
        }
    }

    /// Get the database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
