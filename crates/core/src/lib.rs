//! Adak Core - Shared domain types.
//!
//! This crate provides the types used across Adak components:
//! - `storefront` - HTTP service (sessions, accounts, carts)
//! - `integration-tests` - End-to-end tests against the storefront router
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain logic - no I/O, no
//! clocks, no locks. Concurrency and lifecycle are the storefront's concern.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails
//! - [`cart`] - The cart aggregate and its incrementally maintained totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartError, CartItem, CartProduct, CartSnapshot, CartTotals};
pub use types::*;
