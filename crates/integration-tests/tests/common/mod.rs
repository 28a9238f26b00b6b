//! Shared wiring: every service running over one in-memory store, the same
//! shape the binary assembles with Postgres adapters.

#![allow(dead_code)]

use std::sync::Arc;

use domains::{CommunityDetail, ContentDetail};
use services::communities::{CommunityService, CreateCommunityInput};
use services::content::{ContentService, CreateCommentInput, CreateTextPostInput};
use services::feed::FeedService;
use services::roles::RoleService;
use services::topics::TopicService;
use services::users::{RegisterInput, UserService};
use services::votes::VoteService;
use services::AuthContext;
use auth_adapters::{ArgonPasswordHasher, SessionManager};
use storage_adapters::{MemoryStore, TracingMailer};
use uuid::Uuid;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub content: ContentService,
    pub feed: FeedService,
    pub votes: VoteService,
    pub roles: RoleService,
    pub communities: CommunityService,
    pub topics: TopicService,
    pub users: UserService,
    pub sessions: SessionManager,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            content: ContentService::new(store.clone(), store.clone()),
            feed: FeedService::new(store.clone(), store.clone(), store.clone()),
            votes: VoteService::new(store.clone(), store.clone()),
            roles: RoleService::new(store.clone(), store.clone()),
            communities: CommunityService::new(store.clone(), store.clone(), store.clone()),
            topics: TopicService::new(store.clone()),
            users: UserService::new(
                store.clone(),
                Arc::new(ArgonPasswordHasher::new()),
                store.clone(),
                Arc::new(TracingMailer::new()),
            ),
            sessions: SessionManager::new(store.clone()),
            store,
        }
    }

    /// Registers `<name>@example.com` and returns the caller context.
    pub async fn register(&self, name: &str) -> AuthContext {
        let user = self
            .users
            .register(RegisterInput {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password: "hunter22".into(),
            })
            .await
            .expect("registration must succeed");
        AuthContext::for_user(user.id)
    }

    /// Creates a topic plus a community named `name` owned by `ctx`.
    pub async fn community(&self, ctx: &AuthContext, name: &str) -> CommunityDetail {
        let topic = self
            .topics
            .create(ctx, "pets".into())
            .await
            .expect("topic must be created");
        self.communities
            .create(
                ctx,
                CreateCommunityInput {
                    name: name.to_string(),
                    description: format!("all about {name}"),
                    topic_ids: vec![topic.id],
                },
            )
            .await
            .expect("community must be created")
    }

    pub async fn text_post(
        &self,
        ctx: &AuthContext,
        community_id: Uuid,
        title: &str,
        body: &str,
    ) -> ContentDetail {
        self.content
            .create_text_post(
                ctx,
                CreateTextPostInput {
                    title: title.to_string(),
                    body: body.to_string(),
                    community_id,
                    parent_id: None,
                },
            )
            .await
            .expect("post must be created")
    }

    pub async fn comment(
        &self,
        ctx: &AuthContext,
        community_id: Uuid,
        parent_id: Uuid,
        ancestor_id: Uuid,
        body: &str,
    ) -> ContentDetail {
        self.content
            .create_comment(
                ctx,
                CreateCommentInput {
                    body: body.to_string(),
                    community_id,
                    parent_id,
                    ancestor_id,
                },
            )
            .await
            .expect("comment must be created")
    }
}
