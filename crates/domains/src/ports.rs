//! # Core Traits (Ports)
//!
//! Adapters must implement these traits to be wired into the binary.
//! Multi-write operations (community creation, cascade deletes, vote
//! application) are single port methods so every adapter can make them
//! all-or-nothing in its own transaction mechanism.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::community::{Community, CommunityAppearance, Topic};
use crate::content::{ContentImage, ContentItem, ContentStatus, NewImage};
use crate::error::Result;
use crate::feed::ContentQuery;
use crate::role::Membership;
use crate::user::User;
use crate::vote::VoteRecord;

/// Persistence contract for the unified post/comment store.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Inserts a top-level post and its image rows in one transaction.
    async fn insert_post(&self, item: &ContentItem, images: &[NewImage]) -> Result<()>;

    async fn insert_comment(&self, item: &ContentItem) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>>;

    /// Immediate children only, oldest first.
    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<ContentItem>>;

    async fn find_images(&self, content_id: Uuid) -> Result<Vec<ContentImage>>;

    /// Count of every content item whose `ancestor_id` is the given post.
    async fn count_descendants(&self, ancestor_id: Uuid) -> Result<i64>;

    /// Deletes the item, all descendants, their vote rows and attached
    /// images as one transaction. Returns content rows removed; 0 means the
    /// item was already gone.
    async fn delete_cascade(&self, id: Uuid) -> Result<u64>;

    /// Single-row status update. Returns rows affected (0 or 1).
    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<u64>;

    /// Executes a composed feed query; ordering and filters per
    /// [`ContentQuery`], comments always excluded.
    async fn find_page(&self, query: &ContentQuery) -> Result<Vec<ContentItem>>;

    /// Comments under a thread root, optionally restricted to one author.
    async fn find_thread_comments(
        &self,
        ancestor_id: Uuid,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<ContentItem>>;

    /// Distinct thread roots a user has commented under.
    async fn find_commented_ancestors(&self, creator_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Persistence contract for the one-vote-per-user-per-post ledger.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait VoteRepo: Send + Sync {
    async fn find_vote(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<VoteRecord>>;

    /// Upserts the vote row and applies `points = points + delta` on the
    /// post as a single transaction. The increment must happen server-side,
    /// never read-modify-write in application memory.
    async fn apply_vote(&self, vote: &VoteRecord, delta: i32) -> Result<()>;

    /// Post ids a user has voted on with the given stored value.
    async fn find_voted_post_ids(&self, user_id: Uuid, value: i16) -> Result<Vec<Uuid>>;
}

/// Persistence contract for membership/moderator rows.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RoleRepo: Send + Sync {
    async fn find(&self, user_id: Uuid, community_id: Uuid) -> Result<Option<Membership>>;

    /// Insert-or-update: sets `is_member = true` and refreshes `joined_at`,
    /// leaving any moderator flag untouched.
    async fn upsert_join(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        joined_at: DateTime<Utc>,
    ) -> Result<Membership>;

    /// Sets `is_member = false` on an existing row. Returns rows affected;
    /// 0 signals "never joined" to the caller.
    async fn clear_member(&self, user_id: Uuid, community_id: Uuid) -> Result<u64>;

    /// Count of rows with `is_member = true` for the community.
    async fn count_members(&self, community_id: Uuid) -> Result<i64>;
}

/// Persistence contract for communities.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CommunityRepo: Send + Sync {
    /// Inserts the community, its topic associations and the creator's
    /// moderator+member role in one transaction.
    async fn insert_with_moderator(
        &self,
        community: &Community,
        topic_ids: &[Uuid],
        creator_id: Uuid,
    ) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Community>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Community>>;

    /// Communities where the user holds a membership row.
    async fn find_joined_by_user(&self, user_id: Uuid) -> Result<Vec<Community>>;

    async fn find_topics(&self, community_id: Uuid) -> Result<Vec<Topic>>;

    async fn update_description(&self, id: Uuid, description: &str) -> Result<u64>;

    async fn update_appearance(&self, id: Uuid, appearance: &CommunityAppearance) -> Result<u64>;
}

/// Persistence contract for topics.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TopicRepo: Send + Sync {
    async fn insert(&self, topic: &Topic) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Topic>>;
    async fn find_all(&self) -> Result<Vec<Topic>>;
}

/// Persistence contract for user accounts.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<u64>;
    async fn update_avatar(&self, user_id: Uuid, avatar: &str) -> Result<u64>;
}

/// Short-lived opaque token storage (password reset, sessions).
/// Write-once, read, delete-on-consume, with a TTL.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Media storage contract for image uploads.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persists an upload and returns its relative path. Rejects non-image
    /// content types; on write failure no partial file is considered valid.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// Public URL for a stored media path.
    fn public_url(&self, path: &str) -> String;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Outbound mail contract. Production wiring may be a logging stub; the
/// port exists so reset flows are testable.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<()>;
}
