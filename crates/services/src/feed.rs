//! # Feed Service
//!
//! Cursor-based, time-windowed pagination over the content store. The
//! service owns the `limit + 1` arithmetic, the `has_more` flag, cursor
//! encoding/decoding and the TOP-window lower bounds; repositories only
//! execute the composed [`ContentQuery`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::{
    AppError, CommunityRepo, ContentItem, ContentQuery, ContentRepo, CursorValue, FeedPage,
    FeedScope, FeedSort, Result, RoleRepo, TopWindow,
};
use tracing::instrument;
use uuid::Uuid;

use crate::context::AuthContext;

/// Lower creation bound for a TOP window; `None` means all-time.
pub fn window_start(window: TopWindow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let span = match window {
        TopWindow::Day => Duration::days(1),
        TopWindow::Week => Duration::weeks(1),
        TopWindow::Month => Duration::days(30),
        TopWindow::Year => Duration::days(365),
        TopWindow::AllTime => return None,
    };
    Some(now - span)
}

/// Parses the opaque cursor against the active sort: epoch milliseconds for
/// NEW, a point count for TOP.
pub fn parse_cursor(sort: FeedSort, cursor: &str) -> Result<CursorValue> {
    match sort {
        FeedSort::New => {
            let millis: i64 = cursor
                .parse()
                .map_err(|_| AppError::validation("cursor", "Malformed cursor."))?;
            let at = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| AppError::validation("cursor", "Malformed cursor."))?;
            Ok(CursorValue::CreatedBefore(at))
        }
        FeedSort::Top(_) => {
            let points: i32 = cursor
                .parse()
                .map_err(|_| AppError::validation("cursor", "Malformed cursor."))?;
            Ok(CursorValue::PointsBelow(points))
        }
    }
}

/// The cursor a client should send to fetch the page after `item`.
pub fn encode_cursor(sort: FeedSort, item: &ContentItem) -> String {
    match sort {
        FeedSort::New => item.created_at.timestamp_millis().to_string(),
        FeedSort::Top(_) => item.points.to_string(),
    }
}

pub struct FeedService {
    content: Arc<dyn ContentRepo>,
    communities: Arc<dyn CommunityRepo>,
    roles: Arc<dyn RoleRepo>,
}

impl FeedService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        communities: Arc<dyn CommunityRepo>,
        roles: Arc<dyn RoleRepo>,
    ) -> Self {
        Self {
            content,
            communities,
            roles,
        }
    }

    /// The home feed: a single community when requested, otherwise the
    /// caller's joined communities, otherwise everything. REMOVED items and
    /// comments never appear.
    #[instrument(skip(self, ctx, cursor))]
    pub async fn home_feed(
        &self,
        ctx: &AuthContext,
        sort: FeedSort,
        community_id: Option<Uuid>,
        limit: Option<i64>,
        cursor: Option<String>,
    ) -> Result<FeedPage> {
        let scope = match community_id {
            Some(id) => FeedScope::Community(id),
            None => match ctx.user_id {
                Some(user_id) => {
                    let joined = self.communities.find_joined_by_user(user_id).await?;
                    if joined.is_empty() {
                        FeedScope::Global
                    } else {
                        FeedScope::Communities(joined.into_iter().map(|c| c.id).collect())
                    }
                }
                None => FeedScope::Global,
            },
        };
        self.run(scope, sort, limit, cursor, false).await
    }

    /// One user's submissions.
    pub async fn user_feed(
        &self,
        creator_id: Uuid,
        sort: FeedSort,
        limit: Option<i64>,
        cursor: Option<String>,
    ) -> Result<FeedPage> {
        self.run(FeedScope::Creator(creator_id), sort, limit, cursor, false)
            .await
    }

    /// A community's feed with REMOVED items visible. Moderators only.
    pub async fn moderation_feed(
        &self,
        ctx: &AuthContext,
        community_id: Uuid,
        sort: FeedSort,
        limit: Option<i64>,
        cursor: Option<String>,
    ) -> Result<FeedPage> {
        let user_id = ctx.require_user()?;
        let role = self.roles.find(user_id, community_id).await?;
        if !role.map(|r| r.is_moderator).unwrap_or(false) {
            return Err(AppError::Unauthorized("Moderator permission required."));
        }
        self.run(FeedScope::Community(community_id), sort, limit, cursor, true)
            .await
    }

    async fn run(
        &self,
        scope: FeedScope,
        sort: FeedSort,
        limit: Option<i64>,
        cursor: Option<String>,
        include_removed: bool,
    ) -> Result<FeedPage> {
        // A zero or negative limit means "no pagination": every matching
        // row, has_more = false.
        let limit = limit.filter(|l| *l > 0);
        let cursor = cursor
            .as_deref()
            .map(|raw| parse_cursor(sort, raw))
            .transpose()?;

        let created_after = match sort {
            FeedSort::Top(window) => window_start(window, Utc::now()),
            FeedSort::New => None,
        };

        let query = ContentQuery {
            scope,
            sort,
            created_after,
            cursor,
            take: limit.map(|l| l + 1),
            include_removed,
        };

        let mut items = self.content.find_page(&query).await?;
        let has_more = match limit {
            Some(l) => {
                let more = items.len() as i64 == l + 1;
                items.truncate(l as usize);
                more
            }
            None => false,
        };

        Ok(FeedPage { items, has_more })
    }
}
