//! User repository.
//!
//! Accounts are indexed by id and by email under a single lock, so the
//! unique-email check and the insert happen atomically.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use adak_core::{CartId, Email, UserId};

use super::RepositoryError;
use crate::models::user::User;

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub cart_id: CartId,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: i32,
    by_id: BTreeMap<UserId, StoredUser>,
    by_email: HashMap<Email, UserId>,
}

/// Repository for user accounts.
#[derive(Debug, Default)]
pub struct UserRepository {
    table: RwLock<UserTable>,
}

impl UserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub fn create(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.table.write();

        if table.by_email.contains_key(&new.email) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                new.email
            )));
        }

        table.next_id = table
            .next_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Conflict("user id space exhausted".to_owned()))?;
        let id = UserId::new(table.next_id);

        let user = User {
            id,
            username: new.username,
            email: new.email,
            cart_id: new.cart_id,
            created_at: new.created_at,
        };

        table.by_email.insert(user.email.clone(), id);
        table.by_id.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );

        Ok(user)
    }

    /// Get a user by their ID.
    #[must_use]
    pub fn get_by_id(&self, id: UserId) -> Option<User> {
        self.table.read().by_id.get(&id).map(|s| s.user.clone())
    }

    /// Get a user by their email address.
    #[must_use]
    pub fn get_by_email(&self, email: &Email) -> Option<User> {
        let table = self.table.read();
        let id = table.by_email.get(email)?;
        table.by_id.get(id).map(|s| s.user.clone())
    }

    /// Get a user together with their password hash, for login.
    #[must_use]
    pub fn get_password_hash(&self, email: &Email) -> Option<(User, String)> {
        let table = self.table.read();
        let id = table.by_email.get(email)?;
        table
            .by_id
            .get(id)
            .map(|s| (s.user.clone(), s.password_hash.clone()))
    }

    /// All users, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<User> {
        self.table
            .read()
            .by_id
            .values()
            .map(|s| s.user.clone())
            .collect()
    }

    /// Delete a user, returning the removed account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub fn delete(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut table = self.table.write();
        let stored = table.by_id.remove(&id).ok_or(RepositoryError::NotFound)?;
        table.by_email.remove(&stored.user.email);
        Ok(stored.user)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "sam".to_owned(),
            email: Email::parse(email).unwrap(),
            cart_id: CartId::new(format!("cart-{email}")),
            password_hash: "hash".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let repo = UserRepository::new();
        let a = repo.create(new_user("a@x.com")).unwrap();
        let b = repo.create(new_user("b@x.com")).unwrap();

        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let repo = UserRepository::new();
        repo.create(new_user("a@x.com")).unwrap();

        let err = repo.create(new_user("A@X.com")).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_lookups() {
        let repo = UserRepository::new();
        let user = repo.create(new_user("a@x.com")).unwrap();
        let email = Email::parse("a@x.com").unwrap();

        assert_eq!(repo.get_by_id(user.id), Some(user.clone()));
        assert_eq!(repo.get_by_email(&email), Some(user.clone()));
        let (found, hash) = repo.get_password_hash(&email).unwrap();
        assert_eq!(found, user);
        assert_eq!(hash, "hash");
    }

    #[test]
    fn test_delete_frees_email() {
        let repo = UserRepository::new();
        let user = repo.create(new_user("a@x.com")).unwrap();

        assert_eq!(repo.delete(user.id).unwrap().id, user.id);
        assert_eq!(repo.delete(user.id), Err(RepositoryError::NotFound));
        assert!(repo.is_empty());
        assert!(repo.create(new_user("a@x.com")).is_ok());
    }

    #[test]
    fn test_list_is_ordered() {
        let repo = UserRepository::new();
        repo.create(new_user("b@x.com")).unwrap();
        repo.create(new_user("a@x.com")).unwrap();

        let ids: Vec<_> = repo.list().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UserId::new(1), UserId::new(2)]);
    }
}
