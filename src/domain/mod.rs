//! Domain layer - Pure business abstractions
//!
//! Trait definitions for the persistence and storage boundaries, the inputs
//! they accept and the domain error type. Implementations live in the
//! infrastructure layer.

pub mod errors;
pub mod repositories;

pub use errors::DomainError;
pub use repositories::*;
