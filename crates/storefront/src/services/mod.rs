//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login throttling, tokens, account deletion
//! - `session` - Session registry and its background janitor
//! - `clock` - Injectable time source

pub mod auth;
pub mod clock;
pub mod session;
