//! # In-memory Adapters
//!
//! A single dashmap-backed store implementing every repository port. It
//! mirrors the Postgres adapters' ordering and filtering contracts so the
//! integration suite and local smoke runs exercise the real services
//! without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{
    AppError, Community, CommunityAppearance, CommunityRepo, ContentImage, ContentItem,
    ContentQuery, ContentRepo, ContentStatus, CursorValue, FeedScope, FeedSort,
    Membership, NewImage, Result, RoleRepo, Topic, TopicRepo, TokenCache, User, UserRepo,
    VoteRecord, VoteRepo,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    contents: DashMap<Uuid, ContentItem>,
    images: DashMap<Uuid, ContentImage>,
    votes: DashMap<(Uuid, Uuid), VoteRecord>,
    roles: DashMap<(Uuid, Uuid), Membership>,
    communities: DashMap<Uuid, Community>,
    community_topics: DashMap<Uuid, Vec<Uuid>>,
    topics: DashMap<Uuid, Topic>,
    users: DashMap<Uuid, User>,
    tokens: DashMap<String, (String, DateTime<Utc>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(query: &ContentQuery, item: &ContentItem) -> bool {
        if item.kind.is_comment() {
            return false;
        }
        if !query.include_removed && item.status == ContentStatus::Removed {
            return false;
        }
        let in_scope = match &query.scope {
            FeedScope::Global => true,
            FeedScope::Community(id) => item.community_id == *id,
            FeedScope::Communities(ids) => ids.contains(&item.community_id),
            FeedScope::Creator(id) => item.creator_id == *id,
        };
        if !in_scope {
            return false;
        }
        if let Some(after) = query.created_after {
            if item.created_at < after {
                return false;
            }
        }
        match query.cursor {
            Some(CursorValue::CreatedBefore(at)) => item.created_at < at,
            Some(CursorValue::PointsBelow(points)) => item.points < points,
            None => true,
        }
    }
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn insert_post(&self, item: &ContentItem, images: &[NewImage]) -> Result<()> {
        self.contents.insert(item.id, item.clone());
        for img in images {
            let id = Uuid::now_v7();
            self.images.insert(
                id,
                ContentImage {
                    id,
                    content_id: item.id,
                    path: img.path.clone(),
                    caption: img.caption.clone(),
                    link: img.link.clone(),
                },
            );
        }
        Ok(())
    }

    async fn insert_comment(&self, item: &ContentItem) -> Result<()> {
        self.contents.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>> {
        Ok(self.contents.get(&id).map(|entry| entry.clone()))
    }

    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<ContentItem>> {
        let mut children: Vec<ContentItem> = self
            .contents
            .iter()
            .filter(|entry| entry.parent_id == Some(parent_id))
            .map(|entry| entry.clone())
            .collect();
        children.sort_by_key(|item| item.created_at);
        Ok(children)
    }

    async fn find_images(&self, content_id: Uuid) -> Result<Vec<ContentImage>> {
        let mut images: Vec<ContentImage> = self
            .images
            .iter()
            .filter(|entry| entry.content_id == content_id)
            .map(|entry| entry.clone())
            .collect();
        images.sort_by_key(|img| img.id);
        Ok(images)
    }

    async fn count_descendants(&self, ancestor_id: Uuid) -> Result<i64> {
        Ok(self
            .contents
            .iter()
            .filter(|entry| entry.ancestor_id == Some(ancestor_id))
            .count() as i64)
    }

    async fn delete_cascade(&self, id: Uuid) -> Result<u64> {
        let mut ids: Vec<Uuid> = self
            .contents
            .iter()
            .filter(|entry| entry.ancestor_id == Some(id))
            .map(|entry| entry.id)
            .collect();
        ids.push(id);

        let vote_keys: Vec<(Uuid, Uuid)> = self
            .votes
            .iter()
            .filter(|entry| ids.contains(&entry.post_id))
            .map(|entry| *entry.key())
            .collect();
        for key in vote_keys {
            self.votes.remove(&key);
        }

        let image_ids: Vec<Uuid> = self
            .images
            .iter()
            .filter(|entry| ids.contains(&entry.content_id))
            .map(|entry| entry.id)
            .collect();
        for image_id in image_ids {
            self.images.remove(&image_id);
        }

        let mut removed = 0;
        for content_id in ids {
            if self.contents.remove(&content_id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<u64> {
        match self.contents.get_mut(&id) {
            Some(mut entry) => {
                entry.status = status;
                entry.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_page(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .contents
            .iter()
            .filter(|entry| Self::matches(query, entry))
            .map(|entry| entry.clone())
            .collect();

        match query.sort {
            FeedSort::New => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            FeedSort::Top(_) => items.sort_by(|a, b| {
                b.points
                    .cmp(&a.points)
                    .then(b.created_at.cmp(&a.created_at))
            }),
        }

        if let Some(take) = query.take {
            items.truncate(take as usize);
        }
        Ok(items)
    }

    async fn find_thread_comments(
        &self,
        ancestor_id: Uuid,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<ContentItem>> {
        let mut comments: Vec<ContentItem> = self
            .contents
            .iter()
            .filter(|entry| {
                entry.ancestor_id == Some(ancestor_id)
                    && creator_id.map(|c| entry.creator_id == c).unwrap_or(true)
            })
            .map(|entry| entry.clone())
            .collect();
        comments.sort_by_key(|item| item.created_at);
        Ok(comments)
    }

    async fn find_commented_ancestors(&self, creator_id: Uuid) -> Result<Vec<Uuid>> {
        let mut ancestors: Vec<Uuid> = self
            .contents
            .iter()
            .filter(|entry| entry.creator_id == creator_id && entry.kind.is_comment())
            .filter_map(|entry| entry.ancestor_id)
            .collect();
        ancestors.sort();
        ancestors.dedup();
        Ok(ancestors)
    }
}

#[async_trait]
impl VoteRepo for MemoryStore {
    async fn find_vote(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<VoteRecord>> {
        Ok(self.votes.get(&(user_id, post_id)).map(|entry| *entry))
    }

    async fn apply_vote(&self, vote: &VoteRecord, delta: i32) -> Result<()> {
        let mut post = self
            .contents
            .get_mut(&vote.post_id)
            .ok_or_else(|| AppError::Transaction("post vanished mid-vote".into()))?;
        self.votes.insert((vote.user_id, vote.post_id), *vote);
        post.points += delta;
        Ok(())
    }

    async fn find_voted_post_ids(&self, user_id: Uuid, value: i16) -> Result<Vec<Uuid>> {
        Ok(self
            .votes
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.value == value)
            .map(|entry| entry.post_id)
            .collect())
    }
}

#[async_trait]
impl RoleRepo for MemoryStore {
    async fn find(&self, user_id: Uuid, community_id: Uuid) -> Result<Option<Membership>> {
        Ok(self
            .roles
            .get(&(user_id, community_id))
            .map(|entry| entry.clone()))
    }

    async fn upsert_join(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        joined_at: DateTime<Utc>,
    ) -> Result<Membership> {
        let mut entry = self
            .roles
            .entry((user_id, community_id))
            .or_insert_with(|| Membership {
                user_id,
                community_id,
                is_member: true,
                is_moderator: false,
                joined_at,
            });
        entry.is_member = true;
        entry.joined_at = joined_at;
        Ok(entry.clone())
    }

    async fn clear_member(&self, user_id: Uuid, community_id: Uuid) -> Result<u64> {
        match self.roles.get_mut(&(user_id, community_id)) {
            Some(mut entry) => {
                entry.is_member = false;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count_members(&self, community_id: Uuid) -> Result<i64> {
        Ok(self
            .roles
            .iter()
            .filter(|entry| entry.community_id == community_id && entry.is_member)
            .count() as i64)
    }
}

#[async_trait]
impl CommunityRepo for MemoryStore {
    async fn insert_with_moderator(
        &self,
        community: &Community,
        topic_ids: &[Uuid],
        creator_id: Uuid,
    ) -> Result<()> {
        self.communities.insert(community.id, community.clone());
        self.community_topics
            .insert(community.id, topic_ids.to_vec());
        self.roles.insert(
            (creator_id, community.id),
            Membership {
                user_id: creator_id,
                community_id: community.id,
                is_member: true,
                is_moderator: true,
                joined_at: community.created_at,
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Community>> {
        Ok(self.communities.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Community>> {
        Ok(self
            .communities
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.clone()))
    }

    async fn find_joined_by_user(&self, user_id: Uuid) -> Result<Vec<Community>> {
        let community_ids: Vec<Uuid> = self
            .roles
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.is_member)
            .map(|entry| entry.community_id)
            .collect();
        Ok(community_ids
            .into_iter()
            .filter_map(|id| self.communities.get(&id).map(|entry| entry.clone()))
            .collect())
    }

    async fn find_topics(&self, community_id: Uuid) -> Result<Vec<Topic>> {
        let topic_ids = self
            .community_topics
            .get(&community_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        let mut topics: Vec<Topic> = topic_ids
            .into_iter()
            .filter_map(|id| self.topics.get(&id).map(|entry| entry.clone()))
            .collect();
        topics.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(topics)
    }

    async fn update_description(&self, id: Uuid, description: &str) -> Result<u64> {
        match self.communities.get_mut(&id) {
            Some(mut entry) => {
                entry.description = description.to_string();
                entry.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_appearance(&self, id: Uuid, appearance: &CommunityAppearance) -> Result<u64> {
        match self.communities.get_mut(&id) {
            Some(mut entry) => {
                if let Some(background) = &appearance.background {
                    entry.background = background.clone();
                }
                if let Some(color) = &appearance.background_color {
                    entry.background_color = color.clone();
                }
                if let Some(color) = &appearance.banner_color {
                    entry.banner_color = color.clone();
                }
                if let Some(icon) = &appearance.icon {
                    entry.icon = icon.clone();
                }
                if let Some(banner) = &appearance.banner {
                    entry.banner = banner.clone();
                }
                entry.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl TopicRepo for MemoryStore {
    async fn insert(&self, topic: &Topic) -> Result<()> {
        self.topics.insert(topic.id, topic.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Topic>> {
        Ok(self.topics.get(&id).map(|entry| entry.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Topic>> {
        let mut topics: Vec<Topic> = self.topics.iter().map(|entry| entry.clone()).collect();
        topics.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(topics)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.clone()))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<u64> {
        match self.users.get_mut(&user_id) {
            Some(mut entry) => {
                entry.password_hash = password_hash.to_string();
                entry.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_avatar(&self, user_id: Uuid, avatar: &str) -> Result<u64> {
        match self.users.get_mut(&user_id) {
            Some(mut entry) => {
                entry.avatar = avatar.to_string();
                entry.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl TokenCache for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs as i64);
        self.tokens
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        // The read guard must drop before any remove on the same key.
        let (value, expired) = match self.tokens.get(key) {
            Some(entry) if entry.1 > Utc::now() => (Some(entry.0.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            self.tokens.remove(key);
        }
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.tokens.remove(key);
        Ok(())
    }
}
