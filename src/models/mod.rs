pub mod author;
pub mod book;
pub mod book_authors;
pub mod configuration;
pub mod copy;
pub mod genre;
pub mod librarian;
pub mod loan;
pub mod member;
pub mod user;

pub use book::Book;
pub use configuration::Configuration;
