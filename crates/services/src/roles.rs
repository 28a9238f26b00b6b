//! # Role Service
//!
//! Membership and moderator flags per (user, community). Joining upserts,
//! leaving soft-clears; moderator status survives leaving.

use std::sync::Arc;

use chrono::Utc;
use domains::{AppError, CommunityRepo, Membership, Result, RoleRepo};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::AuthContext;

pub struct RoleService {
    roles: Arc<dyn RoleRepo>,
    communities: Arc<dyn CommunityRepo>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleRepo>, communities: Arc<dyn CommunityRepo>) -> Self {
        Self { roles, communities }
    }

    pub async fn membership(
        &self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> Result<Option<Membership>> {
        self.roles.find(user_id, community_id).await
    }

    /// Idempotent join: repeating it only refreshes `joined_at`.
    #[instrument(skip(self, ctx))]
    pub async fn join(&self, ctx: &AuthContext, community_id: Uuid) -> Result<Membership> {
        let user_id = ctx.require_user()?;

        self.communities
            .find_by_id(community_id)
            .await?
            .ok_or_else(|| AppError::not_found("community", community_id))?;

        let membership = self
            .roles
            .upsert_join(user_id, community_id, Utc::now())
            .await?;
        info!(%community_id, "user joined community");
        Ok(membership)
    }

    /// Soft leave. Leaving a community never joined is a failure the caller
    /// reports; no row is created.
    #[instrument(skip(self, ctx))]
    pub async fn leave(&self, ctx: &AuthContext, community_id: Uuid) -> Result<()> {
        let user_id = ctx.require_user()?;

        let affected = self.roles.clear_member(user_id, community_id).await?;
        if affected == 0 {
            return Err(AppError::not_found("membership", community_id));
        }
        info!(%community_id, "user left community");
        Ok(())
    }

    pub async fn is_moderator(&self, user_id: Uuid, community_id: Uuid) -> Result<bool> {
        Ok(self
            .roles
            .find(user_id, community_id)
            .await?
            .map(|r| r.is_moderator)
            .unwrap_or(false))
    }

    /// Guard used by moderation endpoints.
    pub async fn require_moderator(&self, ctx: &AuthContext, community_id: Uuid) -> Result<Uuid> {
        let user_id = ctx.require_user()?;
        if self.is_moderator(user_id, community_id).await? {
            Ok(user_id)
        } else {
            Err(AppError::Unauthorized("Moderator permission required."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Community, MockCommunityRepo, MockRoleRepo};
    use mockall::predicate::eq;

    fn community(id: Uuid) -> Community {
        Community {
            id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            name: "cats".into(),
            description: "cat pictures".into(),
            background: String::new(),
            background_color: "#DAE0E6".into(),
            banner_color: "#33a8ff".into(),
            icon: String::new(),
            banner: String::new(),
        }
    }

    #[tokio::test]
    async fn join_upserts_membership() {
        let user = Uuid::now_v7();
        let target = Uuid::now_v7();

        let mut communities = MockCommunityRepo::new();
        communities
            .expect_find_by_id()
            .with(eq(target))
            .returning(move |id| Ok(Some(community(id))));

        let mut roles = MockRoleRepo::new();
        roles
            .expect_upsert_join()
            .withf(move |u, c, _| *u == user && *c == target)
            .returning(|user_id, community_id, joined_at| {
                Ok(Membership {
                    user_id,
                    community_id,
                    is_member: true,
                    is_moderator: false,
                    joined_at,
                })
            });

        let svc = RoleService::new(Arc::new(roles), Arc::new(communities));
        let membership = svc.join(&AuthContext::for_user(user), target).await.unwrap();
        assert!(membership.is_member);
        assert!(!membership.is_moderator);
    }

    #[tokio::test]
    async fn join_unknown_community_is_not_found() {
        let mut communities = MockCommunityRepo::new();
        communities.expect_find_by_id().returning(|_| Ok(None));

        let svc = RoleService::new(Arc::new(MockRoleRepo::new()), Arc::new(communities));
        let result = svc
            .join(&AuthContext::for_user(Uuid::now_v7()), Uuid::now_v7())
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn leave_without_membership_fails() {
        let mut roles = MockRoleRepo::new();
        roles.expect_clear_member().returning(|_, _| Ok(0));

        let svc = RoleService::new(Arc::new(roles), Arc::new(MockCommunityRepo::new()));
        let result = svc
            .leave(&AuthContext::for_user(Uuid::now_v7()), Uuid::now_v7())
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn leave_clears_membership() {
        let mut roles = MockRoleRepo::new();
        roles.expect_clear_member().returning(|_, _| Ok(1));

        let svc = RoleService::new(Arc::new(roles), Arc::new(MockCommunityRepo::new()));
        svc.leave(&AuthContext::for_user(Uuid::now_v7()), Uuid::now_v7())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn require_moderator_rejects_plain_members() {
        let user = Uuid::now_v7();
        let target = Uuid::now_v7();

        let mut roles = MockRoleRepo::new();
        roles.expect_find().returning(|user_id, community_id| {
            Ok(Some(Membership {
                user_id,
                community_id,
                is_member: true,
                is_moderator: false,
                joined_at: Utc::now(),
            }))
        });

        let svc = RoleService::new(Arc::new(roles), Arc::new(MockCommunityRepo::new()));
        let result = svc.require_moderator(&AuthContext::for_user(user), target).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
