//! Authentication error types.

use thiserror::Error;

use super::throttle::Throttled;
use super::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format (registration only; login reports `InvalidCredentials`).
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] adak_core::EmailError),

    /// A registration field is missing or out of bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many recent failures for this identity.
    #[error(transparent)]
    Throttled(#[from] Throttled),

    /// The caller already holds an active session.
    #[error("already logged in")]
    AlreadyLoggedIn,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Authorization token missing, invalid, or for another account.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
