//! Services Layer
//!
//! Read models and checks that span several repositories.

pub mod cover_service;
pub mod inventory_service;
pub mod loan_service;
