//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use adak_core::{CartId, Email, UserId};

/// A storefront account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Login identity.
    pub email: Email,
    /// The account's cart. Lives and dies with the account.
    pub cart_id: CartId,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// The view of an account returned by the API.
///
/// Omits the cart id, which doubles as the cart cookie value.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}
