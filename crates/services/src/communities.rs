//! # Community Service
//!
//! Community creation (with the implicit moderator grant), lookups and
//! moderator-gated profile edits.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AppError, Community, CommunityAppearance, CommunityDetail, CommunityRepo, Result, RoleRepo,
    TopicRepo, DEFAULT_BACKGROUND_COLOR, DEFAULT_BANNER_COLOR,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::AuthContext;
use crate::validate::{Validator, COMMUNITY_NAME_MAX_LEN, DESCRIPTION_MAX_LEN};

#[derive(Debug, Clone)]
pub struct CreateCommunityInput {
    pub name: String,
    pub description: String,
    pub topic_ids: Vec<Uuid>,
}

pub struct CommunityService {
    communities: Arc<dyn CommunityRepo>,
    topics: Arc<dyn TopicRepo>,
    roles: Arc<dyn RoleRepo>,
}

impl CommunityService {
    pub fn new(
        communities: Arc<dyn CommunityRepo>,
        topics: Arc<dyn TopicRepo>,
        roles: Arc<dyn RoleRepo>,
    ) -> Self {
        Self {
            communities,
            topics,
            roles,
        }
    }

    /// Creates a community, associates its topics and grants the creator
    /// moderator+member in one transaction.
    #[instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        ctx: &AuthContext,
        input: CreateCommunityInput,
    ) -> Result<CommunityDetail> {
        let creator_id = ctx.require_user()?;

        let mut v = Validator::new();
        v.check(!input.name.trim().is_empty(), "name", "Name is required.")
            .check(
                input.name.chars().count() <= COMMUNITY_NAME_MAX_LEN,
                "name",
                "Name must be at most 50 characters.",
            )
            .check(
                input.description.chars().count() <= DESCRIPTION_MAX_LEN,
                "description",
                "Description must be at most 500 characters.",
            )
            .check(!input.topic_ids.is_empty(), "topicIds", "Topics are required.");
        v.finish()?;

        for topic_id in &input.topic_ids {
            self.topics
                .find_by_id(*topic_id)
                .await?
                .ok_or_else(|| AppError::not_found("topic", topic_id))?;
        }

        // Check-then-insert; the unique index backs this up under races.
        if self.communities.find_by_name(&input.name).await?.is_some() {
            return Err(AppError::conflict("name", "Community name already taken."));
        }

        let now = Utc::now();
        let community = Community {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            name: input.name,
            description: input.description,
            background: String::new(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            banner_color: DEFAULT_BANNER_COLOR.to_string(),
            icon: String::new(),
            banner: String::new(),
        };
        self.communities
            .insert_with_moderator(&community, &input.topic_ids, creator_id)
            .await?;
        info!(community = %community.id, "community created");

        let topics = self.communities.find_topics(community.id).await?;
        Ok(CommunityDetail {
            community,
            topics,
            total_memberships: 1,
        })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<CommunityDetail>> {
        let community = match self.communities.find_by_name(name).await? {
            Some(community) => community,
            None => return Ok(None),
        };
        Ok(Some(self.detail(community).await?))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CommunityDetail>> {
        let community = match self.communities.find_by_id(id).await? {
            Some(community) => community,
            None => return Ok(None),
        };
        Ok(Some(self.detail(community).await?))
    }

    /// Communities the caller holds a membership row in.
    pub async fn joined(&self, ctx: &AuthContext) -> Result<Vec<Community>> {
        let user_id = ctx.require_user()?;
        self.communities.find_joined_by_user(user_id).await
    }

    /// Display figure only, never used for access control.
    pub async fn count_memberships(&self, community_id: Uuid) -> Result<i64> {
        self.roles.count_members(community_id).await
    }

    #[instrument(skip(self, ctx, description))]
    pub async fn edit_description(
        &self,
        ctx: &AuthContext,
        community_id: Uuid,
        description: String,
    ) -> Result<()> {
        self.require_moderator(ctx, community_id).await?;

        let mut v = Validator::new();
        v.check(
            description.chars().count() <= DESCRIPTION_MAX_LEN,
            "description",
            "Description must be at most 500 characters.",
        );
        v.finish()?;

        let affected = self
            .communities
            .update_description(community_id, &description)
            .await?;
        if affected == 0 {
            return Err(AppError::not_found("community", community_id));
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, appearance))]
    pub async fn set_appearance(
        &self,
        ctx: &AuthContext,
        community_id: Uuid,
        appearance: CommunityAppearance,
    ) -> Result<()> {
        self.require_moderator(ctx, community_id).await?;

        let mut v = Validator::new();
        if let Some(color) = &appearance.background_color {
            v.hex_color("backgroundColor", color);
        }
        if let Some(color) = &appearance.banner_color {
            v.hex_color("bannerColor", color);
        }
        v.finish()?;

        let affected = self
            .communities
            .update_appearance(community_id, &appearance)
            .await?;
        if affected == 0 {
            return Err(AppError::not_found("community", community_id));
        }
        Ok(())
    }

    async fn require_moderator(&self, ctx: &AuthContext, community_id: Uuid) -> Result<Uuid> {
        let user_id = ctx.require_user()?;
        let role = self.roles.find(user_id, community_id).await?;
        if role.map(|r| r.is_moderator).unwrap_or(false) {
            Ok(user_id)
        } else {
            Err(AppError::Unauthorized("Moderator permission required."))
        }
    }

    async fn detail(&self, community: Community) -> Result<CommunityDetail> {
        let topics = self.communities.find_topics(community.id).await?;
        let total_memberships = self.roles.count_members(community.id).await?;
        Ok(CommunityDetail {
            community,
            topics,
            total_memberships,
        })
    }
}
