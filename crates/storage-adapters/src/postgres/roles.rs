//! Postgres implementation of `RoleRepo`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{Membership, Result, RoleRepo};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::db_err;

pub struct PgRoleRepo {
    pool: PgPool,
}

impl PgRoleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_membership(row: &PgRow) -> Membership {
    Membership {
        user_id: row.get("user_id"),
        community_id: row.get("community_id"),
        is_member: row.get("is_member"),
        is_moderator: row.get("is_moderator"),
        joined_at: row.get("joined_at"),
    }
}

#[async_trait]
impl RoleRepo for PgRoleRepo {
    async fn find(&self, user_id: Uuid, community_id: Uuid) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT user_id, community_id, is_member, is_moderator, joined_at \
             FROM roles WHERE user_id = $1 AND community_id = $2",
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.as_ref().map(row_to_membership))
    }

    async fn upsert_join(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        joined_at: DateTime<Utc>,
    ) -> Result<Membership> {
        let row = sqlx::query(
            "INSERT INTO roles (user_id, community_id, is_member, is_moderator, joined_at) \
             VALUES ($1, $2, TRUE, FALSE, $3) \
             ON CONFLICT (user_id, community_id) \
             DO UPDATE SET is_member = TRUE, joined_at = EXCLUDED.joined_at \
             RETURNING user_id, community_id, is_member, is_moderator, joined_at",
        )
        .bind(user_id)
        .bind(community_id)
        .bind(joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row_to_membership(&row))
    }

    async fn clear_member(&self, user_id: Uuid, community_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE roles SET is_member = FALSE WHERE user_id = $1 AND community_id = $2",
        )
        .bind(user_id)
        .bind(community_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn count_members(&self, community_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE community_id = $1 AND is_member = TRUE")
            .bind(community_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
