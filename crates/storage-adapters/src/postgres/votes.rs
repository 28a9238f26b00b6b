//! Postgres implementation of `VoteRepo`.

use async_trait::async_trait;
use domains::{Result, VoteRecord, VoteRepo};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use super::{db_err, tx_err};

pub struct PgVoteRepo {
    pool: PgPool,
}

impl PgVoteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteRepo for PgVoteRepo {
    async fn find_vote(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<VoteRecord>> {
        let row = sqlx::query("SELECT user_id, post_id, value FROM upvotes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(|row| VoteRecord {
            user_id: row.get("user_id"),
            post_id: row.get("post_id"),
            value: row.get("value"),
        }))
    }

    /// The upsert and the points increment are one transaction; concurrent
    /// votes by the same user serialize on the (user_id, post_id) key and
    /// the increment happens server-side so parallel voters never lose
    /// updates.
    async fn apply_vote(&self, vote: &VoteRecord, delta: i32) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO upvotes (user_id, post_id, value) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, post_id) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(vote.user_id)
        .bind(vote.post_id)
        .bind(vote.value)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;

        sqlx::query("UPDATE contents SET points = points + $1 WHERE id = $2")
            .bind(delta)
            .bind(vote.post_id)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?;

        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn find_voted_post_ids(&self, user_id: Uuid, value: i16) -> Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT post_id FROM upvotes WHERE user_id = $1 AND value = $2")
            .bind(user_id)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}
