//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. Cookie manager (`tower-cookies`)
//! 5. Rate limiting on `/auth` (governor, binary only)
//!
//! Session checks are extractors, not layers: see [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{CartSession, OptionalSession, RequireSession};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
