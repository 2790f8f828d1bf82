//! Library-management data layer: catalog (books, authors, genres, copies),
//! members, librarians and loans over SeaORM, with the book copy counters
//! kept in step with copy and loan events.

pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use infrastructure::AppState;
pub use infrastructure::config;
pub use infrastructure::db;
pub use infrastructure::seed;
