//! # Content Models
//!
//! Posts and comments share one self-referential entity. Parent/ancestor
//! links are plain id values resolved through indexed lookups, never
//! in-memory references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminates the three shapes a content item can take.
/// Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    TextPost,
    ImagePost,
    Comment,
}

impl ContentKind {
    /// Storage representation, kept stable across migrations.
    pub fn as_i16(self) -> i16 {
        match self {
            ContentKind::TextPost => 0,
            ContentKind::ImagePost => 1,
            ContentKind::Comment => 2,
        }
    }

    pub fn from_i16(raw: i16) -> Option<Self> {
        match raw {
            0 => Some(ContentKind::TextPost),
            1 => Some(ContentKind::ImagePost),
            2 => Some(ContentKind::Comment),
            _ => None,
        }
    }

    pub fn is_comment(self) -> bool {
        matches!(self, ContentKind::Comment)
    }
}

/// Moderation state. Mutable by moderators only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    Active,
    Removed,
}

impl ContentStatus {
    pub fn as_i16(self) -> i16 {
        match self {
            ContentStatus::Active => 0,
            ContentStatus::Removed => 1,
        }
    }

    pub fn from_i16(raw: i16) -> Option<Self> {
        match raw {
            0 => Some(ContentStatus::Active),
            1 => Some(ContentStatus::Removed),
            _ => None,
        }
    }
}

/// The fundamental unit of conversation: a post or a comment.
///
/// Invariants (enforced at creation, asserted in tests):
/// - `kind == Comment` ⇔ `parent_id` and `ancestor_id` are both set.
/// - root posts have `layer == 0`; a comment's layer is `parent.layer + 1`.
/// - `points` changes only through the voting ledger's atomic increment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Required for top-level posts, forbidden for comments.
    pub title: Option<String>,
    /// Required for text posts and comments.
    pub body: Option<String>,
    pub kind: ContentKind,
    pub status: ContentStatus,
    /// Denormalized net vote score.
    pub points: i32,
    pub creator_id: Uuid,
    pub community_id: Uuid,
    /// Immediate parent: a post for a top-level comment, a comment for a reply.
    pub parent_id: Option<Uuid>,
    /// Root post of the thread, set for every comment regardless of depth.
    pub ancestor_id: Option<Uuid>,
    /// Depth in the comment tree, root post = 0.
    pub layer: i32,
}

/// An image attached to an IMAGE_POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentImage {
    pub id: Uuid,
    pub content_id: Uuid,
    /// Relative path under the public media root.
    pub path: String,
    pub caption: Option<String>,
    pub link: Option<String>,
}

/// Image payload supplied at post creation, before a row id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub path: String,
    pub caption: Option<String>,
    pub link: Option<String>,
}

/// A content item with its relations resolved for display: attached images,
/// immediate children and the thread-wide comment count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    pub item: ContentItem,
    pub images: Vec<ContentImage>,
    pub children: Vec<ContentItem>,
    pub comment_count: i64,
}
