//! Postgres implementation of `TopicRepo`.

use async_trait::async_trait;
use domains::{Result, Topic, TopicRepo};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::db_err;

pub struct PgTopicRepo {
    pool: PgPool,
}

impl PgTopicRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_topic(row: &PgRow) -> Topic {
    Topic {
        id: row.get("id"),
        created_at: row.get("created_at"),
        title: row.get("title"),
        creator_id: row.get("creator_id"),
    }
}

#[async_trait]
impl TopicRepo for PgTopicRepo {
    async fn insert(&self, topic: &Topic) -> Result<()> {
        sqlx::query("INSERT INTO topics (id, created_at, title, creator_id) VALUES ($1, $2, $3, $4)")
            .bind(topic.id)
            .bind(topic.created_at)
            .bind(&topic.title)
            .bind(topic.creator_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Topic>> {
        let row = sqlx::query("SELECT id, created_at, title, creator_id FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_topic))
    }

    async fn find_all(&self) -> Result<Vec<Topic>> {
        let rows = sqlx::query("SELECT id, created_at, title, creator_id FROM topics ORDER BY title")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_topic).collect())
    }
}
