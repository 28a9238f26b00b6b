//! # User Service
//!
//! Registration, login and the password-reset flow. Reset tokens live in
//! the token cache behind a fixed prefix with a 24 h TTL and are consumed
//! exactly once.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AppError, Mailer, PasswordHasher, Result, TokenCache, User, UserRepo,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::validate::Validator;

pub const RESET_TOKEN_PREFIX: &str = "forget-password:";
pub const RESET_TOKEN_TTL_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

pub struct UserService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenCache>,
    mailer: Arc<dyn Mailer>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenCache>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            mailer,
        }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<User> {
        let mut v = Validator::new();
        v.username(&input.username)
            .email(&input.email)
            .password(&input.password);
        v.finish()?;

        // Check-then-insert; the unique indexes are the backstop.
        if self.users.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::conflict("username", "Username already taken."));
        }
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::conflict("email", "Email already registered."));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            username: input.username,
            email: input.email,
            password_hash: self.hasher.hash(&input.password)?,
            avatar: String::new(),
        };
        self.users.insert(&user).await?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// Login by username or email. The error never reveals which half of
    /// the pair was wrong.
    pub async fn login(&self, input: LoginInput) -> Result<User> {
        let user = match self.users.find_by_username(&input.username_or_email).await? {
            Some(user) => Some(user),
            None => self.users.find_by_email(&input.username_or_email).await?,
        };

        let user = user.ok_or_else(invalid_credentials)?;
        if !self.hasher.verify(&input.password, &user.password_hash) {
            return Err(invalid_credentials());
        }
        Ok(user)
    }

    /// Issues a reset token. Unknown emails succeed silently so the
    /// endpoint cannot be used to probe for accounts.
    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!("password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = Uuid::new_v4().simple().to_string();
        let key = format!("{RESET_TOKEN_PREFIX}{token}");
        self.tokens
            .set(&key, &user.id.to_string(), RESET_TOKEN_TTL_SECS)
            .await?;
        self.mailer.send_password_reset(&user.email, &token).await?;
        Ok(())
    }

    /// Consumes a reset token and replaces the password hash.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let mut v = Validator::new();
        v.password(new_password);
        v.finish()?;

        let key = format!("{RESET_TOKEN_PREFIX}{token}");
        let user_id = self
            .tokens
            .get(&key)
            .await?
            .ok_or_else(|| AppError::validation("token", "Token expired or invalid."))?;
        let user_id: Uuid = user_id
            .parse()
            .map_err(|_| AppError::Internal("malformed reset token payload".into()))?;

        let hash = self.hasher.hash(new_password)?;
        let affected = self.users.update_password(user_id, &hash).await?;
        if affected == 0 {
            return Err(AppError::not_found("user", user_id));
        }

        self.tokens.delete(&key).await?;
        info!(user = %user_id, "password reset completed");
        Ok(())
    }

    pub async fn update_avatar(&self, user_id: Uuid, avatar: &str) -> Result<()> {
        let affected = self.users.update_avatar(user_id, avatar).await?;
        if affected == 0 {
            return Err(AppError::not_found("user", user_id));
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users.find_by_id(id).await
    }
}

fn invalid_credentials() -> AppError {
    AppError::validation("credentials", "Invalid username or password.")
}
