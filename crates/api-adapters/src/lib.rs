//! warren/crates/api-adapters/src/lib.rs
//!
//! The web routing and orchestration layer for Warren.

pub mod envelope;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use domains::MediaStore;
use services::communities::CommunityService;
use services::content::ContentService;
use services::feed::FeedService;
use services::roles::RoleService;
use services::topics::TopicService;
use services::users::UserService;
use services::votes::VoteService;

pub use auth_adapters::SessionManager;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub feed: Arc<FeedService>,
    pub votes: Arc<VoteService>,
    pub roles: Arc<RoleService>,
    pub communities: Arc<CommunityService>,
    pub topics: Arc<TopicService>,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionManager>,
    pub media: Arc<dyn MediaStore>,
}

/// Builds the API router. The binary mounts this next to static file
/// serving and its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/me", get(handlers::me))
        .route("/api/me/avatar", patch(handlers::update_avatar))
        .route("/api/me/commented-posts", get(handlers::my_commented_posts))
        .route("/api/me/votes", get(handlers::my_voted_posts))
        .route("/api/forgot-password", post(handlers::forgot_password))
        .route("/api/reset-password", post(handlers::reset_password))
        // Topics
        .route(
            "/api/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        // Communities
        .route("/api/communities", post(handlers::create_community))
        // One param name across the group: GET resolves by community name,
        // the nested routes take the community id.
        .route("/api/communities/{community}", get(handlers::get_community))
        .route("/api/me/communities", get(handlers::my_communities))
        .route(
            "/api/communities/{community}/join",
            post(handlers::join_community),
        )
        .route(
            "/api/communities/{community}/leave",
            post(handlers::leave_community),
        )
        .route(
            "/api/communities/{community}/description",
            patch(handlers::update_description),
        )
        .route(
            "/api/communities/{community}/appearance",
            patch(handlers::update_appearance),
        )
        .route(
            "/api/communities/{community}/moderation-feed",
            get(handlers::moderation_feed),
        )
        // Content
        .route("/api/posts/text", post(handlers::create_text_post))
        .route("/api/posts/image", post(handlers::create_image_post))
        .route("/api/comments", post(handlers::create_comment))
        .route(
            "/api/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/api/posts/{id}/status", patch(handlers::update_post_status))
        .route("/api/posts/{id}/comments", get(handlers::post_comments))
        // Feeds
        .route("/api/feed", get(handlers::home_feed))
        .route("/api/users/{id}/posts", get(handlers::user_feed))
        // Votes
        .route("/api/votes", post(handlers::vote))
        .route("/api/votes/{post_id}", get(handlers::get_vote))
        // Media
        .route("/api/media", post(handlers::upload_media))
        .with_state(state)
}
