//! Postgres implementation of `CommunityRepo`.

use async_trait::async_trait;
use domains::{Community, CommunityAppearance, CommunityRepo, Result, Topic};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::{db_err, tx_err};

const COMMUNITY_COLUMNS: &str = "id, created_at, updated_at, name, description, background, \
                                 background_color, banner_color, icon, banner";

pub struct PgCommunityRepo {
    pool: PgPool,
}

impl PgCommunityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_community(row: &PgRow) -> Community {
    Community {
        id: row.get("id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        name: row.get("name"),
        description: row.get("description"),
        background: row.get("background"),
        background_color: row.get("background_color"),
        banner_color: row.get("banner_color"),
        icon: row.get("icon"),
        banner: row.get("banner"),
    }
}

#[async_trait]
impl CommunityRepo for PgCommunityRepo {
    /// Community row, topic links and the creator's moderator role commit
    /// or roll back together; no half-created communities.
    async fn insert_with_moderator(
        &self,
        community: &Community,
        topic_ids: &[Uuid],
        creator_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO communities (id, created_at, updated_at, name, description, background, \
             background_color, banner_color, icon, banner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(community.id)
        .bind(community.created_at)
        .bind(community.updated_at)
        .bind(&community.name)
        .bind(&community.description)
        .bind(&community.background)
        .bind(&community.background_color)
        .bind(&community.banner_color)
        .bind(&community.icon)
        .bind(&community.banner)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;

        for topic_id in topic_ids {
            sqlx::query("INSERT INTO community_topics (community_id, topic_id) VALUES ($1, $2)")
                .bind(community.id)
                .bind(topic_id)
                .execute(&mut *tx)
                .await
                .map_err(tx_err)?;
        }

        sqlx::query(
            "INSERT INTO roles (user_id, community_id, is_member, is_moderator, joined_at) \
             VALUES ($1, $2, TRUE, TRUE, $3)",
        )
        .bind(creator_id)
        .bind(community.id)
        .bind(community.created_at)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;

        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Community>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.as_ref().map(row_to_community))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Community>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.as_ref().map(row_to_community))
    }

    async fn find_joined_by_user(&self, user_id: Uuid) -> Result<Vec<Community>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities c \
             INNER JOIN roles r ON r.community_id = c.id \
             WHERE r.user_id = $1 AND r.is_member = TRUE"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.iter().map(row_to_community).collect())
    }

    async fn find_topics(&self, community_id: Uuid) -> Result<Vec<Topic>> {
        let rows = sqlx::query(
            "SELECT t.id, t.created_at, t.title, t.creator_id FROM topics t \
             INNER JOIN community_topics ct ON ct.topic_id = t.id \
             WHERE ct.community_id = $1 ORDER BY t.title",
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|row| Topic {
                id: row.get("id"),
                created_at: row.get("created_at"),
                title: row.get("title"),
                creator_id: row.get("creator_id"),
            })
            .collect())
    }

    async fn update_description(&self, id: Uuid, description: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE communities SET description = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(description)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    /// COALESCE keeps any field the caller left out.
    async fn update_appearance(&self, id: Uuid, appearance: &CommunityAppearance) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE communities SET \
             background = COALESCE($1, background), \
             background_color = COALESCE($2, background_color), \
             banner_color = COALESCE($3, banner_color), \
             icon = COALESCE($4, icon), \
             banner = COALESCE($5, banner), \
             updated_at = NOW() \
             WHERE id = $6",
        )
        .bind(&appearance.background)
        .bind(&appearance.background_color)
        .bind(&appearance.banner_color)
        .bind(&appearance.icon)
        .bind(&appearance.banner)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
