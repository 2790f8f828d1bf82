//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::DomainError;
use crate::models::{Book, Configuration};
use crate::models::{genre, loan, member, user};

/// Author data for callers
#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub pseudonym: Option<String>,
    pub display_name: String,
}

/// Create or replace an author
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuthorInput {
    #[validate(length(max = 30))]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub pseudonym: Option<String>,
}

/// Repository trait for Author entity
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Author>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Author>, DomainError>;

    async fn create(&self, input: AuthorInput) -> Result<Author, DomainError>;

    async fn update(&self, id: i32, input: AuthorInput) -> Result<Author, DomainError>;

    /// Delete an author, unlinking it from its books
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenreInput {
    #[validate(length(min = 1, max = 30))]
    pub description: String,
}

/// Repository trait for Genre entity
#[async_trait]
pub trait GenreRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<genre::Model>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<genre::Model>, DomainError>;

    async fn create(&self, input: GenreInput) -> Result<genre::Model, DomainError>;

    async fn update(&self, id: i32, input: GenreInput) -> Result<genre::Model, DomainError>;

    /// Fails with `Referenced` while any book uses the genre
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Filter criteria for book queries
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    pub genre_id: Option<i32>,
    pub author_id: Option<i32>,
    pub title: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available_only: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookInput {
    pub isbn: String,
    #[validate(length(min = 1, max = 70))]
    pub title: String,
    #[validate(range(min = 0))]
    pub page_count: i32,
    pub genre_id: i32,
    #[serde(default)]
    pub author_ids: Vec<i32>,
    pub cover: Option<String>,
}

/// Partial update. Copy counters are not part of it on purpose: they only
/// move through copy and loan operations.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBookInput {
    #[validate(length(min = 1, max = 70))]
    pub title: Option<String>,
    #[validate(range(min = 0))]
    pub page_count: Option<i32>,
    pub genre_id: Option<i32>,
    pub author_ids: Option<Vec<i32>>,
    pub cover: Option<Option<String>>,
}

/// Repository trait for Book entity
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_all(&self, filter: BookFilter) -> Result<Vec<Book>, DomainError>;

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, DomainError>;

    /// Validates the ISBN, starts both counters at zero and links the authors
    async fn create(&self, input: CreateBookInput) -> Result<Book, DomainError>;

    async fn update(&self, isbn: &str, input: UpdateBookInput) -> Result<Book, DomainError>;

    /// Removes the book and its copies; refused once a copy has loans
    async fn delete(&self, isbn: &str) -> Result<(), DomainError>;
}

/// Copy data for callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Copy {
    pub id: i32,
    pub book_isbn: String,
    pub copy_number: i32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCopyInput {
    pub book_isbn: String,
    /// Explicit number; when absent the next number for the book is assigned
    pub copy_number: Option<i32>,
}

/// Repository trait for Copy entity
#[async_trait]
pub trait CopyRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Copy>, DomainError>;

    async fn find_by_book(&self, isbn: &str) -> Result<Vec<Copy>, DomainError>;

    /// Highest copy number recorded for the book, 0 when it has none
    async fn max_copy_number(&self, isbn: &str) -> Result<i32, DomainError>;

    /// Numbers the copy and bumps the book's total and available counts
    async fn create(&self, input: CreateCopyInput) -> Result<Copy, DomainError>;

    /// Deletes the copy and lowers the book's total and available counts
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MemberInput {
    #[validate(length(min = 1, max = 10))]
    pub national_id: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(email)]
    #[validate(length(max = 50))]
    pub email: String,
    #[validate(length(max = 50))]
    pub address: String,
    #[validate(length(max = 20))]
    pub mobile: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub birth_date: NaiveDate,
}

/// Repository trait for Member entity
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<member::Model>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<member::Model>, DomainError>;

    async fn find_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<member::Model>, DomainError>;

    async fn create(&self, input: MemberInput) -> Result<member::Model, DomainError>;

    async fn update(&self, id: i32, input: MemberInput) -> Result<member::Model, DomainError>;

    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Librarian data for callers, flattened with the member it extends
#[derive(Debug, Clone, Serialize)]
pub struct Librarian {
    pub member_id: i32,
    pub since: DateTime<Utc>,
    pub user_id: i32,
    pub username: Option<String>,
    pub name: String,
    pub national_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLibrarianInput {
    pub member_id: i32,
    pub user_id: i32,
}

/// Repository trait for Librarian entity
#[async_trait]
pub trait LibrarianRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Librarian>, DomainError>;

    async fn find_by_id(&self, member_id: i32) -> Result<Option<Librarian>, DomainError>;

    async fn find_by_user(&self, user_id: i32) -> Result<Option<Librarian>, DomainError>;

    /// Promotes an existing member, stamping the onboarding time
    async fn create(&self, input: CreateLibrarianInput) -> Result<Librarian, DomainError>;

    async fn delete(&self, member_id: i32) -> Result<(), DomainError>;
}

/// Repository trait for user accounts linked from librarians
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, username: String) -> Result<user::Model, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>, DomainError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, DomainError>;
}

/// Filter parameters for listing loans
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    pub member_id: Option<i32>,
    pub copy_id: Option<i32>,
    /// Only loans without a return date
    pub pending_only: bool,
    /// Only pending loans whose due date is before this day
    pub overdue_on: Option<NaiveDate>,
}

impl LoanFilter {
    pub fn pending() -> Self {
        Self {
            pending_only: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoanInput {
    pub copy_id: i32,
    pub member_id: i32,
    pub issued_by: i32,
    pub received_by: Option<i32>,
    /// Defaults to today + the configured grace period
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLoanInput {
    pub received_by: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

/// Repository trait for Loan entity
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<loan::Model>, DomainError>;

    async fn find_all(&self, filter: LoanFilter) -> Result<Vec<loan::Model>, DomainError>;

    /// Loans whose copy has not come back yet
    async fn find_pending(&self) -> Result<Vec<loan::Model>, DomainError> {
        self.find_all(LoanFilter::pending()).await
    }

    async fn count_pending_for_member(&self, member_id: i32) -> Result<u64, DomainError>;

    /// Issues the copy: assigns the due date and takes the copy off the shelf
    async fn create(&self, input: CreateLoanInput) -> Result<loan::Model, DomainError>;

    /// Records the receiving librarian and/or return; puts the copy back on
    /// the shelf the first time a return date appears
    async fn update(&self, id: i32, input: UpdateLoanInput) -> Result<loan::Model, DomainError>;

    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct ConfigurationInput {
    #[validate(range(min = 0, max = 36500))]
    pub grace_period_days: i32,
    #[validate(range(min = 1))]
    pub max_active_loans: i32,
}

/// Access to the single configuration row
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Reads the singleton, creating it with defaults if missing
    async fn load(&self) -> Result<Configuration, DomainError>;

    /// Upserts the singleton
    async fn save(&self, input: ConfigurationInput) -> Result<Configuration, DomainError>;

    /// A second row is never created: this collapses into `save`
    async fn create(&self, input: ConfigurationInput) -> Result<Configuration, DomainError> {
        self.save(input).await
    }
}

/// Storage for uploaded cover images
#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Persists the upload and returns an opaque reference to it
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, DomainError>;

    fn resolve(&self, reference: &str) -> Result<PathBuf, DomainError>;

    async fn remove(&self, reference: &str) -> Result<(), DomainError>;
}
