//! Postgres implementation of `ContentRepo`.

use async_trait::async_trait;
use domains::{
    AppError, ContentImage, ContentItem, ContentKind, ContentQuery, ContentRepo, ContentStatus,
    CursorValue, FeedScope, FeedSort, NewImage, Result,
};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use super::{db_err, tx_err};

const CONTENT_COLUMNS: &str = "id, created_at, updated_at, title, body, kind, status, points, \
                               creator_id, community_id, parent_id, ancestor_id, layer";

pub struct PgContentRepo {
    pool: PgPool,
}

impl PgContentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &PgRow) -> Result<ContentItem> {
    let kind = ContentKind::from_i16(row.get("kind"))
        .ok_or_else(|| AppError::Internal("unknown content kind tag".into()))?;
    let status = ContentStatus::from_i16(row.get("status"))
        .ok_or_else(|| AppError::Internal("unknown content status tag".into()))?;
    Ok(ContentItem {
        id: row.get("id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        title: row.get("title"),
        body: row.get("body"),
        kind,
        status,
        points: row.get("points"),
        creator_id: row.get("creator_id"),
        community_id: row.get("community_id"),
        parent_id: row.get("parent_id"),
        ancestor_id: row.get("ancestor_id"),
        layer: row.get("layer"),
    })
}

fn row_to_image(row: &PgRow) -> ContentImage {
    ContentImage {
        id: row.get("id"),
        content_id: row.get("content_id"),
        path: row.get("path"),
        caption: row.get("caption"),
        link: row.get("link"),
    }
}

async fn insert_item<'e, E>(executor: E, item: &ContentItem) -> std::result::Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO contents (id, created_at, updated_at, title, body, kind, status, points, \
         creator_id, community_id, parent_id, ancestor_id, layer) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(item.id)
    .bind(item.created_at)
    .bind(item.updated_at)
    .bind(&item.title)
    .bind(&item.body)
    .bind(item.kind.as_i16())
    .bind(item.status.as_i16())
    .bind(item.points)
    .bind(item.creator_id)
    .bind(item.community_id)
    .bind(item.parent_id)
    .bind(item.ancestor_id)
    .bind(item.layer)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl ContentRepo for PgContentRepo {
    /// Post row and image rows commit or roll back together.
    async fn insert_post(&self, item: &ContentItem, images: &[NewImage]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        insert_item(&mut *tx, item).await.map_err(tx_err)?;

        for img in images {
            sqlx::query("INSERT INTO images (id, content_id, path, caption, link) VALUES ($1, $2, $3, $4, $5)")
                .bind(Uuid::now_v7())
                .bind(item.id)
                .bind(&img.path)
                .bind(&img.caption)
                .bind(&img.link)
                .execute(&mut *tx)
                .await
                .map_err(tx_err)?;
        }

        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn insert_comment(&self, item: &ContentItem) -> Result<()> {
        insert_item(&self.pool, item).await.map_err(db_err)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE parent_id = $1 ORDER BY created_at ASC"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn find_images(&self, content_id: Uuid) -> Result<Vec<ContentImage>> {
        let rows = sqlx::query(
            "SELECT id, content_id, path, caption, link FROM images WHERE content_id = $1 ORDER BY id",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.iter().map(row_to_image).collect())
    }

    async fn count_descendants(&self, ancestor_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contents WHERE ancestor_id = $1")
            .bind(ancestor_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Votes and images go first, then descendant comments, then the item
    /// itself; children reference their parents so the order matters.
    async fn delete_cascade(&self, id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM contents WHERE ancestor_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(tx_err)?;
        ids.push(id);

        sqlx::query("DELETE FROM upvotes WHERE post_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?;

        sqlx::query("DELETE FROM images WHERE content_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?;

        let comments = sqlx::query("DELETE FROM contents WHERE ancestor_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?
            .rows_affected();

        let root = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?
            .rows_affected();

        tx.commit().await.map_err(tx_err)?;
        Ok(comments + root)
    }

    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE contents SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_i16())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn find_page(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE kind <> "
        ));
        qb.push_bind(ContentKind::Comment.as_i16());

        if !query.include_removed {
            qb.push(" AND status <> ");
            qb.push_bind(ContentStatus::Removed.as_i16());
        }

        match &query.scope {
            FeedScope::Global => {}
            FeedScope::Community(id) => {
                qb.push(" AND community_id = ");
                qb.push_bind(*id);
            }
            FeedScope::Communities(ids) => {
                qb.push(" AND community_id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
            FeedScope::Creator(id) => {
                qb.push(" AND creator_id = ");
                qb.push_bind(*id);
            }
        }

        if let Some(after) = query.created_after {
            qb.push(" AND created_at >= ");
            qb.push_bind(after);
        }

        match query.cursor {
            Some(CursorValue::CreatedBefore(at)) => {
                qb.push(" AND created_at < ");
                qb.push_bind(at);
            }
            Some(CursorValue::PointsBelow(points)) => {
                qb.push(" AND points < ");
                qb.push_bind(points);
            }
            None => {}
        }

        match query.sort {
            FeedSort::New => {
                qb.push(" ORDER BY created_at DESC");
            }
            FeedSort::Top(_) => {
                qb.push(" ORDER BY points DESC, created_at DESC");
            }
        }

        if let Some(take) = query.take {
            qb.push(" LIMIT ");
            qb.push_bind(take);
        }

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(row_to_item).collect()
    }

    async fn find_thread_comments(
        &self,
        ancestor_id: Uuid,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<ContentItem>> {
        let rows = match creator_id {
            Some(creator) => {
                sqlx::query(&format!(
                    "SELECT {CONTENT_COLUMNS} FROM contents \
                     WHERE ancestor_id = $1 AND creator_id = $2 ORDER BY created_at ASC"
                ))
                .bind(ancestor_id)
                .bind(creator)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CONTENT_COLUMNS} FROM contents \
                     WHERE ancestor_id = $1 ORDER BY created_at ASC"
                ))
                .bind(ancestor_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn find_commented_ancestors(&self, creator_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT DISTINCT ancestor_id FROM contents \
             WHERE creator_id = $1 AND kind = $2 AND ancestor_id IS NOT NULL",
        )
        .bind(creator_id)
        .bind(ContentKind::Comment.as_i16())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
