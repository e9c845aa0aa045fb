//! In-memory storage for storefront state.
//!
//! Everything here lives for the lifetime of the process; nothing is
//! persisted across restarts.
//!
//! # Stores
//!
//! - [`users::UserRepository`] - Accounts and their password hashes
//! - [`carts::CartStore`] - One cart aggregate per account, each behind its own lock

pub mod carts;
pub mod users;

use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}
