//! Adak Storefront library.
//!
//! Sessions, login throttling, accounts and carts behind an axum router.
//! The binary in `main.rs` wires this up with Sentry and the rate limiter;
//! the integration tests drive [`routes::app`] directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
