//! # Content Service
//!
//! CRUD plus structural queries over the post/comment hierarchy. Creation
//! is gated on community membership; removal on ownership; status changes
//! on moderator role. All multi-row writes go through single repo methods
//! so adapters can make them transactional.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AppError, ContentDetail, ContentItem, ContentKind, ContentRepo, ContentStatus, NewImage,
    Result, RoleRepo,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::AuthContext;
use crate::validate::Validator;

#[derive(Debug, Clone)]
pub struct CreateTextPostInput {
    pub title: String,
    pub body: String,
    pub community_id: Uuid,
    /// Posts must not reference a parent; the field exists so a malformed
    /// request can be rejected instead of silently ignored.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateImagePostInput {
    pub title: String,
    pub images: Vec<NewImage>,
    pub community_id: Uuid,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub body: String,
    pub community_id: Uuid,
    pub parent_id: Uuid,
    pub ancestor_id: Uuid,
}

pub struct ContentService {
    content: Arc<dyn ContentRepo>,
    roles: Arc<dyn RoleRepo>,
}

impl ContentService {
    pub fn new(content: Arc<dyn ContentRepo>, roles: Arc<dyn RoleRepo>) -> Self {
        Self { content, roles }
    }

    #[instrument(skip(self, ctx, input), fields(community = %input.community_id))]
    pub async fn create_text_post(
        &self,
        ctx: &AuthContext,
        input: CreateTextPostInput,
    ) -> Result<ContentDetail> {
        let creator_id = ctx.require_user()?;

        let mut v = Validator::new();
        v.title(&input.title).body(&input.body).check(
            input.parent_id.is_none(),
            "parentId",
            "A post cannot reference a parent.",
        );
        v.finish()?;

        self.require_member(creator_id, input.community_id).await?;

        let item = new_item(
            ContentKind::TextPost,
            Some(input.title),
            Some(input.body),
            creator_id,
            input.community_id,
        );
        self.content.insert_post(&item, &[]).await?;
        info!(post = %item.id, "text post created");
        self.detail(item).await
    }

    #[instrument(skip(self, ctx, input), fields(community = %input.community_id))]
    pub async fn create_image_post(
        &self,
        ctx: &AuthContext,
        input: CreateImagePostInput,
    ) -> Result<ContentDetail> {
        let creator_id = ctx.require_user()?;

        let mut v = Validator::new();
        v.title(&input.title)
            .check(
                !input.images.is_empty(),
                "images",
                "At least one image is required.",
            )
            .check(
                input.images.iter().all(|img| !img.path.trim().is_empty()),
                "images",
                "Every image needs a path.",
            )
            .check(
                input.parent_id.is_none(),
                "parentId",
                "A post cannot reference a parent.",
            );
        v.finish()?;

        self.require_member(creator_id, input.community_id).await?;

        let item = new_item(
            ContentKind::ImagePost,
            Some(input.title),
            None,
            creator_id,
            input.community_id,
        );
        self.content.insert_post(&item, &input.images).await?;
        info!(post = %item.id, images = input.images.len(), "image post created");
        self.detail(item).await
    }

    #[instrument(skip(self, ctx, input), fields(parent = %input.parent_id))]
    pub async fn create_comment(
        &self,
        ctx: &AuthContext,
        input: CreateCommentInput,
    ) -> Result<ContentDetail> {
        let creator_id = ctx.require_user()?;

        let mut v = Validator::new();
        v.body(&input.body);
        v.finish()?;

        let parent = self
            .content
            .find_by_id(input.parent_id)
            .await?
            .ok_or_else(|| AppError::not_found("parent", input.parent_id))?;
        let ancestor = self
            .content
            .find_by_id(input.ancestor_id)
            .await?
            .ok_or_else(|| AppError::not_found("ancestor", input.ancestor_id))?;

        // The ancestor must be the root of the parent's thread: the parent
        // itself for a top-level comment, the parent's own ancestor below.
        let expected_ancestor = parent.ancestor_id.unwrap_or(parent.id);
        let mut v = Validator::new();
        v.check(
            !ancestor.kind.is_comment(),
            "ancestorId",
            "The ancestor must be a post, not a comment.",
        )
        .check(
            expected_ancestor == ancestor.id,
            "ancestorId",
            "The ancestor does not match the parent's thread.",
        );
        v.finish()?;

        self.require_member(creator_id, input.community_id).await?;

        let mut item = new_item(
            ContentKind::Comment,
            None,
            Some(input.body),
            creator_id,
            input.community_id,
        );
        item.parent_id = Some(parent.id);
        item.ancestor_id = Some(ancestor.id);
        item.layer = parent.layer + 1;

        self.content.insert_comment(&item).await?;
        info!(comment = %item.id, layer = item.layer, "comment created");
        self.detail(item).await
    }

    /// Resolves an item with its images, immediate children and thread-wide
    /// comment count. Absence is not an error; callers branch on `None`.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentDetail>> {
        match self.content.find_by_id(id).await? {
            Some(item) => Ok(Some(self.detail(item).await?)),
            None => Ok(None),
        }
    }

    /// Deletes the caller's own item and everything hanging off it.
    /// Returns the number of content rows removed; 0 means already gone.
    #[instrument(skip(self, ctx))]
    pub async fn remove(&self, ctx: &AuthContext, id: Uuid) -> Result<u64> {
        let user_id = ctx.require_user()?;

        let item = match self.content.find_by_id(id).await? {
            Some(item) => item,
            None => return Ok(0),
        };
        if item.creator_id != user_id {
            return Err(AppError::Unauthorized("Only the author can delete this."));
        }

        let removed = self.content.delete_cascade(id).await?;
        info!(content = %id, removed, "content removed");
        Ok(removed)
    }

    /// Moderator-only single-row status change. Returns rows affected.
    #[instrument(skip(self, ctx))]
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        status: ContentStatus,
    ) -> Result<u64> {
        let user_id = ctx.require_user()?;

        let item = self
            .content
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("post", id))?;

        let role = self.roles.find(user_id, item.community_id).await?;
        if !role.map(|r| r.is_moderator).unwrap_or(false) {
            return Err(AppError::Unauthorized("Moderator permission required."));
        }

        self.content.update_status(id, status).await
    }

    /// Total comments anywhere under a post, without loading the subtree.
    pub async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        self.content.count_descendants(post_id).await
    }

    /// Comments under a thread root, optionally restricted to one author.
    pub async fn thread_comments(
        &self,
        ancestor_id: Uuid,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<ContentItem>> {
        self.content.find_thread_comments(ancestor_id, creator_id).await
    }

    /// Distinct thread roots the caller has commented under.
    pub async fn commented_ancestors(&self, ctx: &AuthContext) -> Result<Vec<Uuid>> {
        let user_id = ctx.require_user()?;
        self.content.find_commented_ancestors(user_id).await
    }

    async fn require_member(&self, user_id: Uuid, community_id: Uuid) -> Result<()> {
        let role = self.roles.find(user_id, community_id).await?;
        if role.map(|r| r.is_member).unwrap_or(false) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Join the community before posting in it.",
            ))
        }
    }

    async fn detail(&self, item: ContentItem) -> Result<ContentDetail> {
        let images = match item.kind {
            ContentKind::ImagePost => self.content.find_images(item.id).await?,
            _ => Vec::new(),
        };
        let children = self.content.find_children(item.id).await?;
        let comment_count = match item.kind {
            ContentKind::Comment => 0,
            _ => self.content.count_descendants(item.id).await?,
        };
        Ok(ContentDetail {
            item,
            images,
            children,
            comment_count,
        })
    }
}

fn new_item(
    kind: ContentKind,
    title: Option<String>,
    body: Option<String>,
    creator_id: Uuid,
    community_id: Uuid,
) -> ContentItem {
    let now = Utc::now();
    ContentItem {
        id: Uuid::now_v7(),
        created_at: now,
        updated_at: now,
        title,
        body,
        kind,
        status: ContentStatus::Active,
        points: 0,
        creator_id,
        community_id,
        parent_id: None,
        ancestor_id: None,
        layer: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{Membership, MockContentRepo, MockRoleRepo};
    use mockall::predicate::eq;

    fn member_row(user_id: Uuid, community_id: Uuid, moderator: bool) -> Membership {
        Membership {
            user_id,
            community_id,
            is_member: true,
            is_moderator: moderator,
            joined_at: Utc::now(),
        }
    }

    fn post_item(creator_id: Uuid, community_id: Uuid) -> ContentItem {
        let mut item = new_item(
            ContentKind::TextPost,
            Some("hi".into()),
            Some("hello".into()),
            creator_id,
            community_id,
        );
        item.points = 0;
        item
    }

    fn service_with(
        content: MockContentRepo,
        roles: MockRoleRepo,
    ) -> ContentService {
        ContentService::new(Arc::new(content), Arc::new(roles))
    }

    #[tokio::test]
    async fn create_text_post_requires_login() {
        let svc = service_with(MockContentRepo::new(), MockRoleRepo::new());
        let result = svc
            .create_text_post(
                &AuthContext::anonymous(),
                CreateTextPostInput {
                    title: "hi".into(),
                    body: "hello".into(),
                    community_id: Uuid::now_v7(),
                    parent_id: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn create_text_post_rejects_title_plus_parent() {
        let svc = service_with(MockContentRepo::new(), MockRoleRepo::new());
        let result = svc
            .create_text_post(
                &AuthContext::for_user(Uuid::now_v7()),
                CreateTextPostInput {
                    title: "hi".into(),
                    body: "hello".into(),
                    community_id: Uuid::now_v7(),
                    parent_id: Some(Uuid::now_v7()),
                },
            )
            .await;
        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "parentId"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_text_post_requires_membership() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();

        let mut roles = MockRoleRepo::new();
        roles
            .expect_find()
            .with(eq(user), eq(community))
            .returning(|_, _| Ok(None));

        let svc = service_with(MockContentRepo::new(), roles);
        let result = svc
            .create_text_post(
                &AuthContext::for_user(user),
                CreateTextPostInput {
                    title: "hi".into(),
                    body: "hello".into(),
                    community_id: community,
                    parent_id: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn create_text_post_persists_a_root_item() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();

        let mut roles = MockRoleRepo::new();
        roles
            .expect_find()
            .returning(move |u, c| Ok(Some(member_row(u, c, false))));

        let mut content = MockContentRepo::new();
        content
            .expect_insert_post()
            .withf(|item, images| {
                item.kind == ContentKind::TextPost
                    && item.layer == 0
                    && item.parent_id.is_none()
                    && item.ancestor_id.is_none()
                    && item.points == 0
                    && images.is_empty()
            })
            .returning(|_, _| Ok(()));
        content.expect_find_children().returning(|_| Ok(Vec::new()));
        content.expect_count_descendants().returning(|_| Ok(0));

        let svc = service_with(content, roles);
        let detail = svc
            .create_text_post(
                &AuthContext::for_user(user),
                CreateTextPostInput {
                    title: "hi".into(),
                    body: "hello".into(),
                    community_id: community,
                    parent_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.item.creator_id, user);
        assert_eq!(detail.item.status, ContentStatus::Active);
    }

    #[tokio::test]
    async fn create_image_post_rejects_empty_image_list() {
        let svc = service_with(MockContentRepo::new(), MockRoleRepo::new());
        let result = svc
            .create_image_post(
                &AuthContext::for_user(Uuid::now_v7()),
                CreateImagePostInput {
                    title: "look".into(),
                    images: Vec::new(),
                    community_id: Uuid::now_v7(),
                    parent_id: None,
                },
            )
            .await;
        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "images"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_comment_sets_layer_and_thread_links() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();
        let root = post_item(user, community);
        let root_id = root.id;

        let mut roles = MockRoleRepo::new();
        roles
            .expect_find()
            .returning(move |u, c| Ok(Some(member_row(u, c, false))));

        let mut content = MockContentRepo::new();
        let lookup = root.clone();
        content
            .expect_find_by_id()
            .returning(move |id| Ok((id == root_id).then(|| lookup.clone())));
        content
            .expect_insert_comment()
            .withf(move |item| {
                item.kind == ContentKind::Comment
                    && item.parent_id == Some(root_id)
                    && item.ancestor_id == Some(root_id)
                    && item.layer == 1
                    && item.title.is_none()
            })
            .returning(|_| Ok(()));
        content.expect_find_children().returning(|_| Ok(Vec::new()));

        let svc = service_with(content, roles);
        let detail = svc
            .create_comment(
                &AuthContext::for_user(user),
                CreateCommentInput {
                    body: "nice".into(),
                    community_id: community,
                    parent_id: root_id,
                    ancestor_id: root_id,
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.item.layer, 1);
        assert_eq!(detail.comment_count, 0);
    }

    #[tokio::test]
    async fn create_comment_rejects_missing_parent() {
        let mut content = MockContentRepo::new();
        content.expect_find_by_id().returning(|_| Ok(None));

        let svc = service_with(content, MockRoleRepo::new());
        let result = svc
            .create_comment(
                &AuthContext::for_user(Uuid::now_v7()),
                CreateCommentInput {
                    body: "nice".into(),
                    community_id: Uuid::now_v7(),
                    parent_id: Uuid::now_v7(),
                    ancestor_id: Uuid::now_v7(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound { entity: "parent", .. })));
    }

    #[tokio::test]
    async fn create_comment_rejects_mismatched_ancestor() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();
        let thread_a = post_item(user, community);
        let thread_b = post_item(user, community);
        let (a_id, b_id) = (thread_a.id, thread_b.id);

        let mut content = MockContentRepo::new();
        content.expect_find_by_id().returning(move |id| {
            if id == a_id {
                Ok(Some(thread_a.clone()))
            } else if id == b_id {
                Ok(Some(thread_b.clone()))
            } else {
                Ok(None)
            }
        });

        let svc = service_with(content, MockRoleRepo::new());
        let result = svc
            .create_comment(
                &AuthContext::for_user(user),
                CreateCommentInput {
                    body: "nice".into(),
                    community_id: community,
                    parent_id: a_id,
                    ancestor_id: b_id,
                },
            )
            .await;
        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "ancestorId"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_returns_zero_when_already_gone() {
        let mut content = MockContentRepo::new();
        content.expect_find_by_id().returning(|_| Ok(None));

        let svc = service_with(content, MockRoleRepo::new());
        let removed = svc
            .remove(&AuthContext::for_user(Uuid::now_v7()), Uuid::now_v7())
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn remove_rejects_non_owner() {
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();
        let item = post_item(owner, Uuid::now_v7());
        let id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));
        let svc = service_with(content, MockRoleRepo::new());

        let result = svc.remove(&AuthContext::for_user(intruder), id).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn remove_cascades_for_the_owner() {
        let owner = Uuid::now_v7();
        let item = post_item(owner, Uuid::now_v7());
        let id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));
        content
            .expect_delete_cascade()
            .with(eq(id))
            .returning(|_| Ok(4));

        let svc = service_with(content, MockRoleRepo::new());
        let removed = svc.remove(&AuthContext::for_user(owner), id).await.unwrap();
        assert_eq!(removed, 4);
    }

    #[tokio::test]
    async fn update_status_requires_moderator() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();
        let item = post_item(Uuid::now_v7(), community);
        let id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));
        let mut roles = MockRoleRepo::new();
        roles
            .expect_find()
            .returning(move |u, c| Ok(Some(member_row(u, c, false))));

        let svc = service_with(content, roles);
        let result = svc
            .update_status(&AuthContext::for_user(user), id, ContentStatus::Removed)
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn update_status_as_moderator_touches_one_row() {
        let user = Uuid::now_v7();
        let community = Uuid::now_v7();
        let item = post_item(Uuid::now_v7(), community);
        let id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));
        content
            .expect_update_status()
            .with(eq(id), eq(ContentStatus::Removed))
            .returning(|_, _| Ok(1));
        let mut roles = MockRoleRepo::new();
        roles
            .expect_find()
            .returning(move |u, c| Ok(Some(member_row(u, c, true))));

        let svc = service_with(content, roles);
        let affected = svc
            .update_status(&AuthContext::for_user(user), id, ContentStatus::Removed)
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }
}
