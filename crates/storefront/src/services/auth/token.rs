//! Session tokens and signed authorization tokens.
//!
//! Session tokens are opaque random strings whose only meaning is their entry
//! in the session registry. Authorization tokens are stateless: they carry the
//! account id and an HMAC-SHA256 tag over it, `"{id}.{hex(tag)}"`.

use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use adak_core::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Length of a session token. 32 alphanumeric chars carry ~190 bits.
pub const SESSION_TOKEN_LENGTH: usize = 32;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Errors from signing or checking authorization tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token was presented.
    #[error("authorization token missing")]
    Missing,

    /// Token is not of the form `id.signature`.
    #[error("authorization token malformed")]
    Malformed,

    /// Signature does not match the account id.
    #[error("authorization token signature invalid")]
    BadSignature,

    /// Token is valid but names a different account.
    #[error("token does not grant access to this account")]
    AccountMismatch,

    /// The signing key was rejected by the MAC.
    #[error("token signing failed")]
    Signing,
}

/// Generate a random alphanumeric string.
#[must_use]
pub fn random_token(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).copied().map_or('0', char::from)
        })
        .collect()
}

/// Mints and checks the tokens carried in cookies.
pub struct TokenIssuer {
    secret: SecretString,
}

impl TokenIssuer {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Signing)
    }

    /// Sign an account id.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the key cannot be used.
    pub fn sign(&self, user_id: UserId) -> Result<String, TokenError> {
        let id = user_id.to_string();
        let mut mac = self.mac()?;
        mac.update(id.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{id}.{tag}"))
    }

    /// Verify a token and return the account id it carries.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` or `TokenError::BadSignature`.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let (id, tag) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let user_id: UserId = id.parse().map_err(|_| TokenError::Malformed)?;
        let tag = hex::decode(tag).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(id.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&tag).map_err(|_| TokenError::BadSignature)?;

        Ok(user_id)
    }

    /// Check that `token` authorizes acting on `target`'s account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Missing` with no token, a verification error for a
    /// bad one, and `TokenError::AccountMismatch` for another account's token.
    pub fn check_permits(&self, target: UserId, token: Option<&str>) -> Result<(), TokenError> {
        let token = token.ok_or(TokenError::Missing)?;
        let holder = self.verify(token)?;
        if holder != target {
            return Err(TokenError::AccountMismatch);
        }
        Ok(())
    }
}
