//! # Feed Query Model
//!
//! The vocabulary the feed engine speaks to content repositories: a scope,
//! a ranking mode and an optional cursor. Repositories translate a
//! [`ContentQuery`] into their native ordering/filtering; the `limit + 1`
//! arithmetic and `has_more` computation live in the feed service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentItem;

/// Which slice of the content store a feed reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Everything (comments always excluded).
    Global,
    /// A single community's page.
    Community(Uuid),
    /// The communities a user joined: the personalized home feed.
    Communities(Vec<Uuid>),
    /// One user's submissions.
    Creator(Uuid),
}

/// Time window for TOP ranking. `AllTime` has no lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopWindow {
    Day,
    Week,
    Month,
    Year,
    AllTime,
}

/// Ranking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSort {
    /// `created_at` descending.
    New,
    /// `points` descending within the window.
    Top(TopWindow),
}

/// Deserialized cursor: the sort-key value of the last item on the previous
/// page. Items matching the cursor exactly are excluded (strict `<`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorValue {
    CreatedBefore(DateTime<Utc>),
    PointsBelow(i32),
}

/// The fully composed query a repository executes.
#[derive(Debug, Clone)]
pub struct ContentQuery {
    pub scope: FeedScope,
    pub sort: FeedSort,
    /// Lower creation bound for TOP windows; `None` for NEW / all-time.
    pub created_after: Option<DateTime<Utc>>,
    pub cursor: Option<CursorValue>,
    /// Row cap, already inflated to `limit + 1` by the feed service.
    /// `None` fetches every matching row.
    pub take: Option<i64>,
    /// Moderator views keep REMOVED items visible.
    pub include_removed: bool,
}

/// One page of a feed plus the "more rows exist" flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<ContentItem>,
    pub has_more: bool,
}
