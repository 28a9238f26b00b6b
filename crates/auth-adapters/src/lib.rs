//! warren/crates/auth-adapters/src/lib.rs
//!
//! Argon2-based implementation of the `PasswordHasher` port and the
//! redis-backed session manager. Sessions are opaque tokens: nothing about
//! the user is recoverable from the cookie value itself.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier};
use domains::{AppError, Result, TokenCache};
use uuid::Uuid;

/// Cache key prefix for session tokens.
pub const SESSION_PREFIX: &str = "session:";
/// Sessions last a week; every login issues a fresh token.
pub const SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 7;

#[derive(Default)]
pub struct ArgonPasswordHasher;

impl ArgonPasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

impl domains::PasswordHasher for ArgonPasswordHasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Issues, resolves and revokes opaque session tokens backed by the token
/// cache.
pub struct SessionManager {
    tokens: Arc<dyn TokenCache>,
}

impl SessionManager {
    pub fn new(tokens: Arc<dyn TokenCache>) -> Self {
        Self { tokens }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .set(
                &format!("{SESSION_PREFIX}{token}"),
                &user_id.to_string(),
                SESSION_TTL_SECS,
            )
            .await?;
        Ok(token)
    }

    /// `None` for unknown, expired or malformed sessions: the caller is
    /// simply anonymous, never an error.
    pub async fn resolve(&self, token: &str) -> Result<Option<Uuid>> {
        let value = self.tokens.get(&format!("{SESSION_PREFIX}{token}")).await?;
        Ok(value.and_then(|raw| raw.parse().ok()))
    }

    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.tokens.delete(&format!("{SESSION_PREFIX}{token}")).await
    }
}
