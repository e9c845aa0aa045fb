//! Session-related types.

use adak_core::{CartId, Email, UserId};

/// The account behind an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// User's ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// The account's cart.
    pub cart_id: CartId,
}

/// Cookie names.
pub mod cookie_names {
    /// Opaque session token, keyed in the session registry.
    pub const SESSION: &str = "SID";

    /// Signed authorization token binding the account id.
    pub const AUTHORIZATION: &str = "UID";

    /// Cart correlation token.
    pub const CART: &str = "CID";

    /// All cookies set at login and removed at logout.
    pub const ALL: [&str; 3] = [SESSION, AUTHORIZATION, CART];
}
