//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - Configuration loading (config)
//! - Cover file storage (cover_store)
//! - Repository implementations (repositories)
//! - Demo data (seed)
//! - Application state (state)

pub mod config;
pub mod cover_store;
pub mod db;
pub mod repositories;
pub mod seed;
pub mod state;

pub use cover_store::LocalCoverStore;
pub use repositories::*;
pub use state::AppState;
