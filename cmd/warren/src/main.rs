//! # Warren Binary
//!
//! Assembles the application: settings, logging, Postgres + migrations,
//! redis, adapters, services, and the axum server with static media
//! serving.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use auth_adapters::{ArgonPasswordHasher, SessionManager};
use configs::Settings;
use domains::{MediaStore, TokenCache};
use secrecy::ExposeSecret;
use services::communities::CommunityService;
use services::content::ContentService;
use services::feed::FeedService;
use services::roles::RoleService;
use services::topics::TopicService;
use services::users::UserService;
use services::votes::VoteService;
use sqlx::postgres::PgPoolOptions;
use storage_adapters::postgres::{
    PgCommunityRepo, PgContentRepo, PgRoleRepo, PgTopicRepo, PgUserRepo, PgVoteRepo,
};
use storage_adapters::{LocalMediaStore, RedisTokenCache, TracingMailer};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("loading settings")?;

    // Database + migrations
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(settings.database.url.expose_secret())
        .await
        .context("connecting to postgres")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    // Redis-backed token cache (sessions + password reset)
    let redis_pool = deadpool_redis::Config::from_url(&settings.redis.url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .context("creating redis pool")?;
    let tokens: Arc<dyn TokenCache> = Arc::new(RedisTokenCache::new(redis_pool));

    // Adapters
    let content_repo = Arc::new(PgContentRepo::new(pool.clone()));
    let vote_repo = Arc::new(PgVoteRepo::new(pool.clone()));
    let role_repo = Arc::new(PgRoleRepo::new(pool.clone()));
    let community_repo = Arc::new(PgCommunityRepo::new(pool.clone()));
    let topic_repo = Arc::new(PgTopicRepo::new(pool.clone()));
    let user_repo = Arc::new(PgUserRepo::new(pool.clone()));
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
        PathBuf::from(&settings.media.root),
        settings.media.url_prefix.clone(),
    ));

    // Services
    let state = AppState {
        content: Arc::new(ContentService::new(content_repo.clone(), role_repo.clone())),
        feed: Arc::new(FeedService::new(
            content_repo.clone(),
            community_repo.clone(),
            role_repo.clone(),
        )),
        votes: Arc::new(VoteService::new(vote_repo, content_repo)),
        roles: Arc::new(RoleService::new(role_repo.clone(), community_repo.clone())),
        communities: Arc::new(CommunityService::new(
            community_repo,
            topic_repo.clone(),
            role_repo,
        )),
        topics: Arc::new(TopicService::new(topic_repo)),
        users: Arc::new(UserService::new(
            user_repo,
            Arc::new(ArgonPasswordHasher::new()),
            tokens.clone(),
            Arc::new(TracingMailer::new()),
        )),
        sessions: Arc::new(SessionManager::new(tokens)),
        media,
    };

    let app = router(state)
        .nest_service(
            settings.media.url_prefix.as_str(),
            ServeDir::new(&settings.media.root),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "warren listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
