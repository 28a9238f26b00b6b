//! Postgres implementation of `UserRepo`.

use async_trait::async_trait;
use domains::{Result, User, UserRepo};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::db_err;

const USER_COLUMNS: &str = "id, created_at, updated_at, username, email, password_hash, avatar";

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, created_at, updated_at, username, email, password_hash, avatar) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn update_avatar(&self, user_id: Uuid, avatar: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE users SET avatar = $1, updated_at = NOW() WHERE id = $2")
            .bind(avatar)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
